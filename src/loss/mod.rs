pub mod loss_type;

pub use loss_type::LossType;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bce_is_zero_for_confident_correct_prediction() {
        let l = LossType::BinaryCrossEntropy.loss(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(l < 1e-9);
    }

    #[test]
    fn bce_derivative_points_toward_target() {
        let d = LossType::BinaryCrossEntropy.derivative(&[0.3, 0.8], &[1.0, 0.0]);
        assert!(d[0] < 0.0);
        assert!(d[1] > 0.0);
    }

    #[test]
    fn cross_entropy_gradient_is_difference() {
        let d = LossType::CrossEntropy.derivative(&[0.7, 0.2, 0.1], &[0.0, 1.0, 0.0]);
        assert_eq!(d, vec![0.7, -0.8, 0.1]);
    }

    #[test]
    fn mse_averages_squared_error() {
        assert!((LossType::Mse.loss(&[1.0, 3.0], &[0.0, 1.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn bce_gradient_matches_finite_difference() {
        let (p, y) = ([0.35, 0.6], [1.0, 0.0]);
        let d = LossType::BinaryCrossEntropy.derivative(&p, &y);
        let eps = 1e-7;
        let bumped = LossType::BinaryCrossEntropy.loss(&[p[0] + eps, p[1]], &y);
        let numeric = (bumped - LossType::BinaryCrossEntropy.loss(&p, &y)) / eps;
        assert!((numeric - d[0]).abs() < 1e-4);
    }
}
