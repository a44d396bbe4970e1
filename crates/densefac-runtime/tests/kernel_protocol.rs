mod support;

use densefac_runtime::builtins::{lq, qr};
use densefac_runtime::element::ElementKind;
use densefac_runtime::kernel::{KernelEntry, KernelPhase, Routine};
use densefac_runtime::{
    lq_factorize, qr_factorize, Complex64, DenseMatrix, FactorError, FactorMode, LqRequest,
    PermutationForm, QrPivot, QrRequest, Value,
};
use densefac_builtins::Tensor;
use support::{sample, Call, RecordingKernel};

fn qr_request(pivot: QrPivot) -> QrRequest {
    QrRequest {
        mode: FactorMode::Full,
        pivot,
        want_q: true,
    }
}

fn entries(calls: &[Call]) -> Vec<(String, KernelPhase)> {
    calls
        .iter()
        .map(|c| (c.entry.to_string(), c.phase))
        .collect()
}

#[test]
fn qr_queries_then_executes_each_entry() {
    let kernel = RecordingKernel::new();
    let a = sample::<f64>(5, 3, 1);
    qr_factorize(&kernel, &a, &qr_request(QrPivot::None)).unwrap();
    let calls = kernel.calls();
    assert_eq!(
        entries(&calls),
        vec![
            ("DGEQRF".to_string(), KernelPhase::Query),
            ("DGEQRF".to_string(), KernelPhase::Execute),
            ("DORGQR".to_string(), KernelPhase::Query),
            ("DORGQR".to_string(), KernelPhase::Execute),
        ]
    );
    assert_eq!(calls[0].lwork, -1);
    assert!(calls[1].lwork >= 1);
    assert!(calls[3].lwork >= 1);
}

#[test]
fn pipeline_variant_selects_entry() {
    let a = sample::<Complex64>(4, 4, 2);
    for (pivot, expected) in [
        (QrPivot::Positive, "ZGEQRFP"),
        (QrPivot::Pivoted(PermutationForm::Vector), "ZGEQP3"),
    ] {
        let kernel = RecordingKernel::new();
        qr_factorize(&kernel, &a, &qr_request(pivot)).unwrap();
        let names: Vec<String> = kernel.calls().iter().map(|c| c.entry.to_string()).collect();
        assert_eq!(names, vec![expected, expected, "ZUNGQR", "ZUNGQR"]);
    }
}

#[test]
fn lq_uses_gelqf_and_orglq() {
    let kernel = RecordingKernel::new();
    let a = sample::<f32>(2, 6, 3);
    lq_factorize(&kernel, &a, &LqRequest { mode: FactorMode::Full, want_q: true }).unwrap();
    let names: Vec<String> = kernel.calls().iter().map(|c| c.entry.to_string()).collect();
    assert_eq!(names, vec!["SGELQF", "SGELQF", "SORGLQ", "SORGLQ"]);
}

#[test]
fn triangular_only_requests_skip_expansion() {
    let kernel = RecordingKernel::new();
    let a = sample::<f64>(3, 3, 4);
    let req = QrRequest {
        want_q: false,
        ..qr_request(QrPivot::None)
    };
    qr_factorize(&kernel, &a, &req).unwrap();
    assert_eq!(kernel.calls().len(), 2);
}

#[test]
fn empty_inputs_never_reach_the_kernel() {
    let kernel = RecordingKernel::new();
    for (m, n) in [(0, 5), (5, 0), (0, 0)] {
        let a = DenseMatrix::<f64>::zeros(m, n);
        for pivot in [
            QrPivot::None,
            QrPivot::Positive,
            QrPivot::Pivoted(PermutationForm::Matrix),
        ] {
            qr_factorize(&kernel, &a, &qr_request(pivot)).unwrap();
        }
        lq_factorize(&kernel, &a, &LqRequest { mode: FactorMode::Economy, want_q: true }).unwrap();
    }
    assert!(kernel.calls().is_empty());
}

#[test]
fn qr_failure_at_any_entry_and_phase_is_reported() {
    let a = sample::<f64>(4, 3, 5);
    let cases = [
        (Routine::Geqrf, QrPivot::None),
        (Routine::Geqrfp, QrPivot::Positive),
        (Routine::Geqp3, QrPivot::Pivoted(PermutationForm::Matrix)),
        (Routine::Orgqr, QrPivot::None),
    ];
    for (routine, pivot) in cases {
        for phase in [KernelPhase::Query, KernelPhase::Execute] {
            let kernel = RecordingKernel::failing(routine, phase, -4);
            let err = qr_factorize(&kernel, &a, &qr_request(pivot)).unwrap_err();
            assert_eq!(
                err,
                FactorError::KernelFailure {
                    entry: KernelEntry::new(routine, ElementKind::F64),
                    phase,
                    info: -4,
                }
            );
            // Nothing runs after the failing call.
            let last = *kernel.calls().last().unwrap();
            assert_eq!((last.entry.routine, last.phase), (routine, phase));
        }
    }
}

#[test]
fn lq_failure_names_entry() {
    let a = sample::<Complex64>(3, 5, 6);
    for routine in [Routine::Gelqf, Routine::Orglq] {
        let kernel = RecordingKernel::failing(routine, KernelPhase::Execute, 2);
        let err = lq_factorize(&kernel, &a, &LqRequest { mode: FactorMode::Full, want_q: true })
            .unwrap_err();
        let expected = if routine == Routine::Gelqf {
            "ZGELQF not successful (execute call returned info = 2)"
        } else {
            "ZUNGLQ not successful (execute call returned info = 2)"
        };
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn builtins_propagate_kernel_failures_without_outputs() {
    let value = Value::Tensor(Tensor::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap());

    let kernel = RecordingKernel::failing(Routine::Orgqr, KernelPhase::Query, -1);
    let err = qr::evaluate_with(&kernel, value.clone(), &[], 2).unwrap_err();
    assert_eq!(err.identifier(), "densefac:KernelFailure");
    // A single-output call never expands Q, so the failure is not reached.
    assert!(qr::evaluate_with(&kernel, value.clone(), &[], 1).is_ok());

    let kernel = RecordingKernel::failing(Routine::Gelqf, KernelPhase::Query, -3);
    let err = lq::evaluate_with(&kernel, value, &[], 1).unwrap_err();
    assert!(matches!(err, FactorError::KernelFailure { info: -3, .. }));
}

#[test]
fn builtin_degenerate_input_makes_no_kernel_calls() {
    let kernel = RecordingKernel::new();
    let empty = Value::Tensor(Tensor::new(Vec::new(), vec![0, 3]).unwrap());
    let eval = qr::evaluate_with(&kernel, empty, &[], 3).unwrap();
    assert!(kernel.calls().is_empty());
    match eval.q() {
        Some(Value::Tensor(q)) => assert_eq!(q.shape, vec![0, 0]),
        other => panic!("expected empty Q, got {other:?}"),
    }
    match eval.permutation() {
        Some(Value::Tensor(p)) => {
            assert_eq!(p.shape, vec![3, 3]);
            assert_eq!(p.data, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        }
        other => panic!("expected identity permutation, got {other:?}"),
    }
}

#[test]
fn pivots_outside_one_to_n_are_rejected() {
    let a = sample::<f64>(4, 3, 9);
    for pivots in [vec![1, 1, 3], vec![0, 2, 3], vec![1, 2, 4], vec![3, -2, 1]] {
        let kernel = RecordingKernel::reporting_pivots(pivots.clone());
        let err = qr_factorize(&kernel, &a, &qr_request(QrPivot::Pivoted(PermutationForm::Matrix)))
            .unwrap_err();
        assert_eq!(
            err,
            FactorError::InvalidPermutation {
                entry: KernelEntry::new(Routine::Geqp3, ElementKind::F64),
            },
            "{pivots:?}"
        );
        assert_eq!(err.identifier(), "densefac:InvalidPermutation");
        // Q is never expanded from a rejected factorization.
        assert!(kernel.calls().iter().all(|c| c.entry.routine == Routine::Geqp3));
    }

    let kernel = RecordingKernel::reporting_pivots(vec![2, 3, 1]);
    let f = qr_factorize(&kernel, &a, &qr_request(QrPivot::Pivoted(PermutationForm::Vector))).unwrap();
    assert_eq!(f.permutation.unwrap().data(), &[2.0, 3.0, 1.0]);
}
