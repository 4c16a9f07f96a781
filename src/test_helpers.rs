const TOLERANCE: f32 = 1e-5;

pub(crate) trait TestHelper {
    fn assert_approx_eq(self, expected: Self);
}

impl TestHelper for f32 {
    fn assert_approx_eq(self, expected: Self) {
        assert!(
            (self - expected).abs() <= TOLERANCE,
            "expected {expected}, got {self}"
        );
    }
}

impl<const N: usize> TestHelper for [f32; N] {
    fn assert_approx_eq(self, expected: Self) {
        for (actual, expected) in self.into_iter().zip(expected) {
            actual.assert_approx_eq(expected);
        }
    }
}
