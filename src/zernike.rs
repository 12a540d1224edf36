//! Zernike wavefront phases over the unit pupil disk

/// Evaluates the wavefront phase at polar pupil coordinates `(r, theta)`,
/// `r` normalized to the pupil radius.
///
/// The basis is the first 15 orthonormal Zernike polynomials in Noll order
/// (piston, tip/tilt, defocus, astigmatisms, comas, trefoils, primary
/// spherical, secondary astigmatisms and tetrafoils); `coefficients[i]`
/// weights Noll index `i + 1`. The returned phase carries the same unit as
/// the coefficients.
pub fn zernike_phase(r: f64, theta: f64, coefficients: &[f64; 15]) -> f64 {
    let r_sq = r * r;
    let mut z = coefficients[0];
    z += coefficients[1] * 2. * r * theta.cos();
    z += coefficients[2] * 2. * r * theta.sin();
    z += coefficients[3] * 3f64.sqrt() * (2. * r_sq - 1.);
    z += coefficients[4] * 6f64.sqrt() * r_sq * (2. * theta).sin();
    z += coefficients[5] * 6f64.sqrt() * r_sq * (2. * theta).cos();
    z += coefficients[6] * 8f64.sqrt() * (3. * r_sq - 2.) * r * theta.sin();
    z += coefficients[7] * 8f64.sqrt() * (3. * r_sq - 2.) * r * theta.cos();
    z += coefficients[8] * 8f64.sqrt() * r_sq * r * (3. * theta).sin();
    z += coefficients[9] * 8f64.sqrt() * r_sq * r * (3. * theta).cos();
    z += coefficients[10] * 5f64.sqrt() * (1. - 6. * r_sq + 6. * r_sq * r_sq);
    z += coefficients[11] * 10f64.sqrt() * (4. * r_sq - 3.) * r_sq * (2. * theta).cos();
    z += coefficients[12] * 10f64.sqrt() * (4. * r_sq - 3.) * r_sq * (2. * theta).sin();
    z += coefficients[13] * 10f64.sqrt() * r_sq * r_sq * (4. * theta).cos();
    z += coefficients[14] * 10f64.sqrt() * r_sq * r_sq * (4. * theta).sin();
    z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basis(r: f64, theta: f64) -> [f64; 15] {
        let mut values = [0f64; 15];
        for (i, value) in values.iter_mut().enumerate() {
            let mut coefficients = [0f64; 15];
            coefficients[i] = 1.;
            *value = zernike_phase(r, theta, &coefficients);
        }
        values
    }

    #[test]
    fn orthonormality() {
        // Midpoint rule over the unit disk, <Z_i,Z_j> = (1/pi) Int Z_i Z_j
        let n = 400;
        let mut gram = [[0f64; 15]; 15];
        let cell = 2. / n as f64;
        for i in 0..n {
            let y = (i as f64 + 0.5) * cell - 1.;
            for j in 0..n {
                let x = (j as f64 + 0.5) * cell - 1.;
                let r = x.hypot(y);
                if r > 1. {
                    continue;
                }
                let z = basis(r, y.atan2(x));
                for p in 0..15 {
                    for q in p..15 {
                        gram[p][q] += z[p] * z[q];
                    }
                }
            }
        }
        let w = cell * cell / std::f64::consts::PI;
        for p in 0..15 {
            for q in p..15 {
                let inner = gram[p][q] * w;
                let expected = if p == q { 1. } else { 0. };
                assert!(
                    (inner - expected).abs() < 2e-3,
                    "<Z{},Z{}> = {inner}",
                    p + 1,
                    q + 1
                );
            }
        }
    }

    #[test]
    fn defocus_on_axis() {
        let mut coefficients = [0f64; 15];
        coefficients[3] = 1.;
        // sqrt(3)(2r^2 - 1) at r = 0 and r = 1
        assert!((zernike_phase(0., 0., &coefficients) + 3f64.sqrt()).abs() < 1e-12);
        assert!((zernike_phase(1., 0.7, &coefficients) - 3f64.sqrt()).abs() < 1e-12);
    }
}
