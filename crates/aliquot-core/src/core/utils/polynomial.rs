use nalgebra::{Complex, Matrix3};

/// Imaginary parts at or below this magnitude (relative to the real part) are
/// treated as numerical noise from the eigenvalue solver.
const IMAGINARY_TOLERANCE: f64 = 1e-9;

/// Returns all roots of the polynomial whose coefficients are given highest
/// degree first, e.g. `[a, b, c, d]` for `a·x³ + b·x² + c·x + d`.
///
/// Leading zero coefficients are stripped before solving, so a cubic whose
/// `a` term vanishes is solved as a quadratic (and so on down to a linear
/// equation). Cubics are solved through the eigenvalues of their companion
/// matrix; lower degrees use closed forms. A polynomial that is identically
/// constant has no roots. Degrees above three are not solved and also yield
/// no roots.
pub fn roots(coefficients: &[f64]) -> Vec<Complex<f64>> {
    let trimmed: Vec<f64> = coefficients
        .iter()
        .copied()
        .skip_while(|c| *c == 0.0)
        .collect();

    match trimmed.as_slice() {
        [] | [_] => Vec::new(),
        [a, b] => vec![Complex::new(-b / a, 0.0)],
        [a, b, c] => quadratic_roots(*a, *b, *c),
        [a, b, c, d] => cubic_roots(*a, *b, *c, *d),
        _ => Vec::new(),
    }
}

/// Returns the real roots of the polynomial, discarding complex ones.
pub fn real_roots(coefficients: &[f64]) -> Vec<f64> {
    roots(coefficients)
        .into_iter()
        .filter(|root| root.im.abs() <= IMAGINARY_TOLERANCE * root.re.abs().max(1.0))
        .map(|root| root.re)
        .collect()
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<Complex<f64>> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant >= 0.0 {
        let sqrt_disc = discriminant.sqrt();
        // Avoids cancellation when b and sqrt_disc are close in magnitude.
        let sign = if b < 0.0 { -1.0 } else { 1.0 };
        let q = -0.5 * (b + sign * sqrt_disc);
        let first = q / a;
        let second = if q != 0.0 { c / q } else { first };
        vec![Complex::new(first, 0.0), Complex::new(second, 0.0)]
    } else {
        let re = -b / (2.0 * a);
        let im = (-discriminant).sqrt() / (2.0 * a);
        vec![Complex::new(re, im), Complex::new(re, -im)]
    }
}

fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<Complex<f64>> {
    let companion = Matrix3::new(
        -b / a, -c / a, -d / a, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0,
    );
    companion.complex_eigenvalues().iter().copied().collect()
}

/// Rounds to four decimal places, the resolution at which candidate liquid
/// heights are compared.
#[inline]
pub fn round_to_4_decimals(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
