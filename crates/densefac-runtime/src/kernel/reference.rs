//! Portable Householder kernel.
//!
//! Unblocked column-by-column (QR) and row-by-row (LQ) reductions that honour the LAPACK calling
//! contract exactly: same argument order and `info` codes, packed generators with `tau`, `jpvt`
//! semantics and `lwork = -1` workspace queries. It trades speed for having no native
//! dependencies.

use num_traits::{Float, One, Zero};

use super::{FactorKernel, Kernel};
use crate::element::FactorScalar;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceKernel;

impl Kernel for ReferenceKernel {
    fn name(&self) -> &'static str {
        "reference"
    }
}

/// Column-major view over a kernel buffer with leading dimension `lda`.
struct View<'a, T> {
    data: &'a mut [T],
    lda: usize,
}

impl<'a, T: FactorScalar> View<'a, T> {
    fn get(&self, row: usize, col: usize) -> T {
        self.data[row + col * self.lda]
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row + col * self.lda] = value;
    }

    fn swap_columns(&mut self, rows: usize, a: usize, b: usize) {
        if a == b {
            return;
        }
        for row in 0..rows {
            self.data.swap(row + a * self.lda, row + b * self.lda);
        }
    }
}

struct Dims {
    m: usize,
    n: usize,
    lda: usize,
}

/// Validate `m`, `n`, `lda` and the storage behind `a`. `a_arg` is the position of `a` in the
/// routine's argument list, with `lda` immediately after it.
fn check_matrix<T>(m: i32, n: i32, a: &[T], lda: i32, a_arg: i32) -> Result<Dims, i32> {
    if m < 0 {
        return Err(-1);
    }
    if n < 0 {
        return Err(-2);
    }
    if lda < m.max(1) {
        return Err(-(a_arg + 1));
    }
    let (m, n, lda) = (m as usize, n as usize, lda as usize);
    let required = if n == 0 { 0 } else { lda * (n - 1) + m };
    if a.len() < required {
        return Err(-a_arg);
    }
    Ok(Dims { m, n, lda })
}

/// Handle the `lwork` argument. Returns `Ok(true)` when the call was a query that has been
/// answered, `Ok(false)` when execution should proceed.
fn check_workspace<T: FactorScalar>(
    work: &mut [T],
    lwork: i32,
    required: usize,
    lwork_arg: i32,
) -> Result<bool, i32> {
    if work.is_empty() {
        return Err(-(lwork_arg - 1));
    }
    if lwork == -1 {
        work[0] = T::from_len(required);
        return Ok(true);
    }
    if lwork < 0 || (lwork as usize) < required {
        return Err(-lwork_arg);
    }
    Ok(false)
}

fn status(result: Result<(), i32>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(info) => info,
    }
}

/// Euclidean norm accumulated with a running scale, as `?nrm2` does.
fn norm2<T: FactorScalar>(values: impl IntoIterator<Item = T>) -> T::Real {
    let zero = T::Real::zero();
    let one = T::Real::one();
    let mut scale = zero;
    let mut ssq = one;
    for z in values {
        for part in [z.re(), z.im()] {
            if part == zero {
                continue;
            }
            let abs = part.abs();
            if scale < abs {
                let r = scale / abs;
                ssq = one + ssq * r * r;
                scale = abs;
            } else {
                let r = abs / scale;
                ssq += r * r;
            }
        }
    }
    scale * ssq.sqrt()
}

/// `sqrt(a² + b² + c²)` without intermediate overflow.
fn lapy3<R: Float>(a: R, b: R, c: R) -> R {
    let (a, b, c) = (a.abs(), b.abs(), c.abs());
    let w = a.max(b).max(c);
    if w == R::zero() {
        return a + b + c;
    }
    let (a, b, c) = (a / w, b / w, c / w);
    w * (a * a + b * b + c * c).sqrt()
}

/// Generate an elementary reflector `H = I - tau·v·vᴴ` with `Hᴴ·[alpha; x] = [beta; 0]` and
/// `beta` real. `x` is overwritten with `v(1..)`; `v(0) = 1` is implicit.
///
/// With `positive` set, `beta >= 0` always; otherwise `beta` takes the sign opposite to
/// `re(alpha)`. Norms below the safe minimum are rescaled first, the way `?larfg` does.
fn generate_reflector<T: FactorScalar>(alpha: T, x: &mut [T], positive: bool) -> (T, T) {
    let zero = T::Real::zero();
    let mut alphr = alpha.re();
    let mut alphi = alpha.im();
    let mut xnorm = norm2(x.iter().copied());

    if xnorm == zero && alphi == zero && (alphr >= zero || !positive) {
        return (alpha, T::zero());
    }

    let safmin = T::Real::min_positive_value() / T::Real::epsilon();
    let rsafmn = safmin.recip();
    let mut norm = lapy3(alphr, alphi, xnorm);
    let mut knt = 0;
    if norm < safmin {
        while norm < safmin && knt < 20 {
            knt += 1;
            for z in x.iter_mut() {
                *z = z.scale(rsafmn);
            }
            alphr = alphr * rsafmn;
            alphi = alphi * rsafmn;
            norm = norm * rsafmn;
        }
        xnorm = norm2(x.iter().copied());
        norm = lapy3(alphr, alphi, xnorm);
    }

    let (beta, diff) = if positive {
        let diff_re = if alphr < zero {
            alphr - norm
        } else {
            // alpha - norm without cancellation
            let h = alphi.hypot(xnorm);
            -(h / (alphr + norm)) * h
        };
        (norm, T::from_parts(diff_re, alphi))
    } else {
        let beta = if alphr >= zero { -norm } else { norm };
        (beta, T::from_parts(alphr - beta, alphi))
    };

    let mut beta_out = beta;
    for _ in 0..knt {
        beta_out = beta_out * safmin;
    }

    if diff == T::zero() {
        // Tail is negligible next to a real non-negative alpha.
        for z in x.iter_mut() {
            *z = T::zero();
        }
        return (T::from_real(beta_out), T::zero());
    }

    let tau = -diff.scale(beta.recip());
    let inv = diff.inv();
    for z in x.iter_mut() {
        *z *= inv;
    }
    (T::from_real(beta_out), tau)
}

/// Reflector vector stored below the diagonal of column `col`, starting at row `start`.
fn column_reflector<T: FactorScalar>(view: &View<'_, T>, col: usize, start: usize, rows: usize) -> Vec<T> {
    let mut v = Vec::with_capacity(rows - start);
    v.push(T::one());
    for row in (start + 1)..rows {
        v.push(view.get(row, col));
    }
    v
}

/// `c ← (I - tau·v·vᴴ)·c` for column `col`, rows `start..`.
fn apply_left<T: FactorScalar>(view: &mut View<'_, T>, v: &[T], tau: T, start: usize, col: usize) {
    let mut dot = T::zero();
    for (offset, vi) in v.iter().enumerate() {
        dot += vi.conj() * view.get(start + offset, col);
    }
    dot *= tau;
    for (offset, vi) in v.iter().enumerate() {
        let row = start + offset;
        let updated = view.get(row, col) - *vi * dot;
        view.set(row, col, updated);
    }
}

/// `r ← r·(I - tau·v·vᴴ)` for row `row`, columns `start..`.
fn apply_right<T: FactorScalar>(view: &mut View<'_, T>, v: &[T], tau: T, start: usize, row: usize) {
    let mut dot = T::zero();
    for (offset, vi) in v.iter().enumerate() {
        dot += view.get(row, start + offset) * *vi;
    }
    dot *= tau;
    for (offset, vi) in v.iter().enumerate() {
        let col = start + offset;
        let updated = view.get(row, col) - dot * vi.conj();
        view.set(row, col, updated);
    }
}

/// Reduce column `i` with a reflector and apply `Hᴴ` to the trailing columns.
fn reduce_column<T: FactorScalar>(view: &mut View<'_, T>, dims: &Dims, i: usize, positive: bool) -> T {
    let alpha = view.get(i, i);
    let mut x: Vec<T> = ((i + 1)..dims.m).map(|row| view.get(row, i)).collect();
    let (beta, tau) = generate_reflector(alpha, &mut x, positive);
    for (offset, value) in x.iter().enumerate() {
        view.set(i + 1 + offset, i, *value);
    }
    if tau != T::zero() && i + 1 < dims.n {
        let v = column_reflector(view, i, i, dims.m);
        for col in (i + 1)..dims.n {
            apply_left(view, &v, tau.conj(), i, col);
        }
    }
    view.set(i, i, beta);
    tau
}

fn column_norm_from<T: FactorScalar>(view: &View<'_, T>, col: usize, start: usize, rows: usize) -> T::Real {
    norm2((start..rows).map(|row| view.get(row, col)))
}

fn select_pivot<T: FactorScalar>(view: &View<'_, T>, dims: &Dims, start: usize) -> usize {
    let mut pivot = start;
    let mut max_norm = T::Real::zero();
    for col in start..dims.n {
        let norm = column_norm_from(view, col, start, dims.m);
        if norm > max_norm {
            max_norm = norm;
            pivot = col;
        }
    }
    pivot
}

#[allow(clippy::too_many_arguments)]
fn householder_qr<T: FactorScalar>(
    m: i32,
    n: i32,
    a: &mut [T],
    lda: i32,
    tau: &mut [T],
    work: &mut [T],
    lwork: i32,
    positive: bool,
) -> Result<(), i32> {
    let dims = check_matrix(m, n, a, lda, 3)?;
    let k = dims.m.min(dims.n);
    if tau.len() < k {
        return Err(-5);
    }
    if check_workspace(work, lwork, dims.n.max(1), 7)? || k == 0 {
        return Ok(());
    }
    let mut view = View { data: a, lda: dims.lda };
    for i in 0..k {
        tau[i] = reduce_column(&mut view, &dims, i, positive);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn pivoted_qr<T: FactorScalar>(
    m: i32,
    n: i32,
    a: &mut [T],
    lda: i32,
    jpvt: &mut [i32],
    tau: &mut [T],
    work: &mut [T],
    lwork: i32,
) -> Result<(), i32> {
    let dims = check_matrix(m, n, a, lda, 3)?;
    if jpvt.len() < dims.n {
        return Err(-5);
    }
    let k = dims.m.min(dims.n);
    if tau.len() < k {
        return Err(-6);
    }
    let required = if T::KIND.is_complex() {
        dims.n + 1
    } else {
        3 * dims.n + 1
    };
    if check_workspace(work, lwork, required, 8)? {
        return Ok(());
    }

    let mut view = View { data: a, lda: dims.lda };

    // Move fixed columns to the front.
    let mut nfxd = 0;
    for j in 0..dims.n {
        if jpvt[j] != 0 {
            if j != nfxd {
                view.swap_columns(dims.m, j, nfxd);
                jpvt[j] = jpvt[nfxd];
                jpvt[nfxd] = j as i32 + 1;
            } else {
                jpvt[j] = j as i32 + 1;
            }
            nfxd += 1;
        } else {
            jpvt[j] = j as i32 + 1;
        }
    }

    for i in 0..k {
        if i >= nfxd {
            let pivot = select_pivot(&view, &dims, i);
            if pivot != i {
                view.swap_columns(dims.m, i, pivot);
                jpvt.swap(i, pivot);
            }
        }
        tau[i] = reduce_column(&mut view, &dims, i, false);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn expand_qr<T: FactorScalar>(
    m: i32,
    n: i32,
    k: i32,
    a: &mut [T],
    lda: i32,
    tau: &[T],
    work: &mut [T],
    lwork: i32,
) -> Result<(), i32> {
    if m < 0 {
        return Err(-1);
    }
    if n < 0 || n > m {
        return Err(-2);
    }
    if k < 0 || k > n {
        return Err(-3);
    }
    let dims = check_matrix(m, n, a, lda, 4)?;
    let k = k as usize;
    if tau.len() < k {
        return Err(-6);
    }
    if check_workspace(work, lwork, dims.n.max(1), 8)? || dims.n == 0 {
        return Ok(());
    }

    let mut view = View { data: a, lda: dims.lda };
    for col in k..dims.n {
        for row in 0..dims.m {
            view.set(row, col, T::zero());
        }
        view.set(col, col, T::one());
    }

    for i in (0..k).rev() {
        if i + 1 < dims.n {
            view.set(i, i, T::one());
            let v = column_reflector(&view, i, i, dims.m);
            for col in (i + 1)..dims.n {
                apply_left(&mut view, &v, tau[i], i, col);
            }
        }
        for row in (i + 1)..dims.m {
            let scaled = view.get(row, i) * -tau[i];
            view.set(row, i, scaled);
        }
        view.set(i, i, T::one() - tau[i]);
        for row in 0..i {
            view.set(row, i, T::zero());
        }
    }
    Ok(())
}

fn householder_lq<T: FactorScalar>(
    m: i32,
    n: i32,
    a: &mut [T],
    lda: i32,
    tau: &mut [T],
    work: &mut [T],
    lwork: i32,
) -> Result<(), i32> {
    let dims = check_matrix(m, n, a, lda, 3)?;
    let k = dims.m.min(dims.n);
    if tau.len() < k {
        return Err(-5);
    }
    if check_workspace(work, lwork, dims.m.max(1), 7)? || k == 0 {
        return Ok(());
    }

    let mut view = View { data: a, lda: dims.lda };
    for i in 0..k {
        let alpha = view.get(i, i).conj();
        let mut x: Vec<T> = ((i + 1)..dims.n).map(|col| view.get(i, col).conj()).collect();
        let (beta, t) = generate_reflector(alpha, &mut x, false);
        tau[i] = t;
        if t != T::zero() && i + 1 < dims.m {
            let mut v = Vec::with_capacity(x.len() + 1);
            v.push(T::one());
            v.extend_from_slice(&x);
            for row in (i + 1)..dims.m {
                apply_right(&mut view, &v, t, i, row);
            }
        }
        view.set(i, i, beta);
        for (offset, value) in x.iter().enumerate() {
            view.set(i, i + 1 + offset, value.conj());
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn expand_lq<T: FactorScalar>(
    m: i32,
    n: i32,
    k: i32,
    a: &mut [T],
    lda: i32,
    tau: &[T],
    work: &mut [T],
    lwork: i32,
) -> Result<(), i32> {
    if m < 0 {
        return Err(-1);
    }
    if n < m {
        return Err(-2);
    }
    if k < 0 || k > m {
        return Err(-3);
    }
    let dims = check_matrix(m, n, a, lda, 4)?;
    let k = k as usize;
    if tau.len() < k {
        return Err(-6);
    }
    if check_workspace(work, lwork, dims.m.max(1), 8)? || dims.m == 0 {
        return Ok(());
    }

    let mut view = View { data: a, lda: dims.lda };
    if k < dims.m {
        for col in 0..dims.n {
            for row in k..dims.m {
                view.set(row, col, T::zero());
            }
            if col >= k && col < dims.m {
                view.set(col, col, T::one());
            }
        }
    }

    for i in (0..k).rev() {
        if i + 1 < dims.n {
            let mut v = Vec::with_capacity(dims.n - i);
            v.push(T::one());
            v.extend(((i + 1)..dims.n).map(|col| view.get(i, col).conj()));
            for row in (i + 1)..dims.m {
                apply_right(&mut view, &v, tau[i].conj(), i, row);
            }
            for (offset, vi) in v.iter().enumerate().skip(1) {
                view.set(i, i + offset, (*vi * -tau[i]).conj());
            }
        }
        view.set(i, i, T::one() - tau[i].conj());
        for col in 0..i {
            view.set(i, col, T::zero());
        }
    }
    Ok(())
}

impl<T: FactorScalar> FactorKernel<T> for ReferenceKernel {
    fn geqrf(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32 {
        status(householder_qr(m, n, a, lda, tau, work, lwork, false))
    }

    fn geqrfp(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32 {
        status(householder_qr(m, n, a, lda, tau, work, lwork, true))
    }

    fn geqp3(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        jpvt: &mut [i32],
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
        _rwork: &mut [T::Real],
    ) -> i32 {
        status(pivoted_qr(m, n, a, lda, jpvt, tau, work, lwork))
    }

    fn orgqr(
        &self,
        m: i32,
        n: i32,
        k: i32,
        a: &mut [T],
        lda: i32,
        tau: &[T],
        work: &mut [T],
        lwork: i32,
    ) -> i32 {
        status(expand_qr(m, n, k, a, lda, tau, work, lwork))
    }

    fn gelqf(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32 {
        status(householder_lq(m, n, a, lda, tau, work, lwork))
    }

    fn orglq(
        &self,
        m: i32,
        n: i32,
        k: i32,
        a: &mut [T],
        lda: i32,
        tau: &[T],
        work: &mut [T],
        lwork: i32,
    ) -> i32 {
        status(expand_lq(m, n, k, a, lda, tau, work, lwork))
    }
}
