use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;

/// Number of indices needed to address one component
pub trait TensorRank {
    const RANK: usize;
}

/// The tensor type one rank above `Self` with the same component type
pub trait IncrementRank {
    type Output;
}

/// The tensor type one rank below `Self` with the same component type
pub trait DecrementRank {
    type Output;
}

/// The complex counterpart of `Self` (complex types map to themselves)
pub trait MakeNumber {
    type Output;
}

/// The real counterpart of `Self` (real types map to themselves)
pub trait MakeReal {
    type Output;
}

macro_rules! impl_type_family {
    (@ranks $scalar:ty) => {
        impl TensorRank for $scalar {
            const RANK: usize = 0;
        }
        impl TensorRank for Vector3<$scalar> {
            const RANK: usize = 1;
        }
        impl TensorRank for Matrix3<$scalar> {
            const RANK: usize = 2;
        }

        impl IncrementRank for $scalar {
            type Output = Vector3<$scalar>;
        }
        impl IncrementRank for Vector3<$scalar> {
            type Output = Matrix3<$scalar>;
        }

        impl DecrementRank for Vector3<$scalar> {
            type Output = $scalar;
        }
        impl DecrementRank for Matrix3<$scalar> {
            type Output = Vector3<$scalar>;
        }
    };
    ($real:ty, $number:ty) => {
        impl_type_family!(@ranks $real);
        impl_type_family!(@ranks $number);

        impl MakeNumber for $real {
            type Output = $number;
        }
        impl MakeNumber for Vector3<$real> {
            type Output = Vector3<$number>;
        }
        impl MakeNumber for Matrix3<$real> {
            type Output = Matrix3<$number>;
        }
        impl MakeNumber for $number {
            type Output = $number;
        }
        impl MakeNumber for Vector3<$number> {
            type Output = Vector3<$number>;
        }
        impl MakeNumber for Matrix3<$number> {
            type Output = Matrix3<$number>;
        }

        impl MakeReal for $real {
            type Output = $real;
        }
        impl MakeReal for Vector3<$real> {
            type Output = Vector3<$real>;
        }
        impl MakeReal for Matrix3<$real> {
            type Output = Matrix3<$real>;
        }
        impl MakeReal for $number {
            type Output = $real;
        }
        impl MakeReal for Vector3<$number> {
            type Output = Vector3<$real>;
        }
        impl MakeReal for Matrix3<$number> {
            type Output = Matrix3<$real>;
        }
    };
}

impl_type_family!(f64, Complex64);

/// Full contraction of two tensors of the same rank
///
/// Complex components are multiplied without conjugation. Mixing real and complex operands
/// produces a complex result.
pub trait InnerProduct<Rhs: ?Sized = Self> {
    type Output;

    fn inner_product(&self, rhs: &Rhs) -> Self::Output;
}

macro_rules! impl_inner_product {
    ($lhs:ty, $rhs:ty => $out:ty) => {
        impl InnerProduct<$rhs> for $lhs {
            type Output = $out;

            fn inner_product(&self, rhs: &$rhs) -> $out {
                <$out>::from(*self) * <$out>::from(*rhs)
            }
        }

        impl InnerProduct<Vector3<$rhs>> for Vector3<$lhs> {
            type Output = $out;

            fn inner_product(&self, rhs: &Vector3<$rhs>) -> $out {
                self.iter().zip(rhs.iter()).map(|(a, b)| a.inner_product(b)).sum()
            }
        }

        impl InnerProduct<Matrix3<$rhs>> for Matrix3<$lhs> {
            type Output = $out;

            fn inner_product(&self, rhs: &Matrix3<$rhs>) -> $out {
                self.iter().zip(rhs.iter()).map(|(a, b)| a.inner_product(b)).sum()
            }
        }
    };
}

impl_inner_product!(f64, f64 => f64);
impl_inner_product!(f64, Complex64 => Complex64);
impl_inner_product!(Complex64, f64 => Complex64);
impl_inner_product!(Complex64, Complex64 => Complex64);

pub fn inner_product<A, B>(a: &A, b: &B) -> A::Output
where
    A: InnerProduct<B>,
{
    a.inner_product(b)
}

/// Squared magnitude (squared Frobenius norm for tensors); always real
pub trait NormSq {
    fn norm_sq(&self) -> f64;
}

impl NormSq for f64 {
    fn norm_sq(&self) -> f64 {
        self * self
    }
}

impl NormSq for Complex64 {
    fn norm_sq(&self) -> f64 {
        self.norm_sqr()
    }
}

macro_rules! impl_norm_sq {
    ($($tensor:ty),*) => {
        $(
            impl NormSq for $tensor {
                fn norm_sq(&self) -> f64 {
                    self.iter().map(|component| component.norm_sq()).sum()
                }
            }
        )*
    };
}

impl_norm_sq!(Vector3<f64>, Vector3<Complex64>, Matrix3<f64>, Matrix3<Complex64>);

pub fn norm_sq<T: NormSq>(value: &T) -> f64 {
    value.norm_sq()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    fn same_type<A: 'static, B: 'static>() -> bool {
        TypeId::of::<A>() == TypeId::of::<B>()
    }

    #[test]
    fn rank_promotion() {
        assert!(same_type::<<f64 as IncrementRank>::Output, Vector3<f64>>());
        assert!(same_type::<<Vector3<f64> as IncrementRank>::Output, Matrix3<f64>>());
        assert!(same_type::<<Matrix3<Complex64> as DecrementRank>::Output, Vector3<Complex64>>());
        assert!(same_type::<
            <<f64 as IncrementRank>::Output as DecrementRank>::Output,
            f64,
        >());

        assert_eq!(<f64 as TensorRank>::RANK, 0);
        assert_eq!(<<f64 as IncrementRank>::Output as TensorRank>::RANK, 1);
        assert_eq!(<Matrix3<Complex64> as TensorRank>::RANK, 2);
    }

    #[test]
    fn real_and_number_types() {
        assert!(same_type::<<f64 as MakeNumber>::Output, Complex64>());
        assert!(same_type::<<Vector3<f64> as MakeNumber>::Output, Vector3<Complex64>>());
        assert!(same_type::<<Complex64 as MakeNumber>::Output, Complex64>());
        assert!(same_type::<<Matrix3<Complex64> as MakeReal>::Output, Matrix3<f64>>());
        assert!(same_type::<<<f64 as MakeNumber>::Output as MakeReal>::Output, f64>());
    }

    #[test]
    fn inner_products() {
        assert_eq!(inner_product(&2.0_f64, &3.0_f64), 6.0);

        let a: Vector3<f64> = Vector3::new(1.0, 2.0, 3.0);
        let b: Vector3<f64> = Vector3::new(4.0, -5.0, 6.0);
        assert_eq!(inner_product(&a, &b), 12.0);

        let i = Complex64::new(0.0, 1.0);
        assert_eq!(inner_product(&i, &i), Complex64::new(-1.0, 0.0));
        assert_eq!(inner_product(&2.0_f64, &i), Complex64::new(0.0, 2.0));

        let c = Vector3::new(i, i, Complex64::new(1.0, 0.0));
        assert_eq!(inner_product(&a, &c), Complex64::new(3.0, 3.0));

        let identity = Matrix3::<f64>::identity();
        let m: Matrix3<f64> = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        // contraction with the identity is the trace
        assert_eq!(inner_product(&identity, &m), 15.0);
    }

    #[test]
    fn squared_norms() {
        assert_eq!(norm_sq(&-3.0_f64), 9.0);
        assert_eq!(norm_sq(&Complex64::new(3.0, 4.0)), 25.0);
        assert_eq!(norm_sq(&Vector3::<f64>::new(1.0, 2.0, 2.0)), 9.0);
        assert_eq!(
            norm_sq(&Vector3::new(Complex64::new(0.0, 1.0), Complex64::new(1.0, 1.0), Complex64::new(0.0, 0.0))),
            3.0
        );
        assert_eq!(norm_sq(&Matrix3::<f64>::identity()), 3.0);
        assert_eq!(norm_sq(&(Matrix3::<Complex64>::identity() * Complex64::new(0.0, 2.0))), 12.0);
    }
}
