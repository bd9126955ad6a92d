//! Backend parity tests - every backend satisfies the same canonical properties.
//!
//! The property checks are written once, generic over `T: Tensor`, and run
//! against each backend. With the `candle` feature, the candle backend is
//! also compared value by value against the ndarray backend.

use bento::backend::ndarray::{NdArrayTensor, NdDType};
use bento::backend::{Tensor, Wrap};
use bento::{Axes, Index, IndexItem, Slice, TensorError};
use ndarray::{ArrayD, IxDyn};

const TOLERANCE: f64 = 1e-5;

fn assert_values_close(actual: &[f64], expected: &[f64], name: &str) {
    assert_eq!(actual.len(), expected.len(), "{name}: length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        assert!(diff < TOLERANCE, "{name}[{i}]: actual={a}, expected={e}, diff={diff}");
    }
}

fn values<T: Tensor>(t: &T) -> Vec<f64> {
    t.numpy().unwrap().iter().copied().collect()
}

fn array(values: &[f64], shape: &[usize]) -> ArrayD<f64> {
    ArrayD::from_shape_vec(IxDyn(shape), values.to_vec()).unwrap()
}

/// Builds tensors on the backend of `seed`
struct Maker<T: Tensor> {
    seed: T,
    int: T::DType,
}

impl<T: Tensor> Maker<T> {
    fn float(&self, values: &[f64], shape: &[usize]) -> T {
        self.seed.from_numpy(&array(values, shape)).unwrap()
    }

    fn ints(&self, values: &[f64]) -> T {
        self.float(values, &[values.len()]).astype(self.int).unwrap()
    }
}

fn ndarray_maker() -> Maker<NdArrayTensor> {
    Maker { seed: NdArrayTensor::from(ndarray::arr0(0.0).into_dyn()), int: NdDType::I64 }
}

#[cfg(feature = "candle")]
fn candle_maker() -> Maker<bento::backend::candle::CandleTensor> {
    use candle_core::{DType, Device};
    let seed = candle_core::Tensor::zeros((), DType::F64, &Device::Cpu).unwrap();
    Maker { seed: seed.into(), int: DType::I64 }
}

// ============================================================================
// Properties, generic over the backend
// ============================================================================

fn softmax_properties<T: Tensor>(m: &Maker<T>) {
    let x = m.float(&[1.0, 2.0, 3.0, -1.0, 0.0, 4.0], &[2, 3]);
    let sm = x.softmax(-1).unwrap();
    assert_values_close(&values(&sm.sum(-1, false).unwrap()), &[1.0, 1.0], "softmax sum");

    let shifted = x.add(100.0).unwrap().softmax(-1).unwrap();
    assert_values_close(&values(&shifted), &values(&sm), "softmax shift invariance");

    let lsm = x.log_softmax(-1).unwrap();
    assert_values_close(&values(&lsm), &values(&sm.log().unwrap()), "log_softmax");
}

fn crossentropy_example<T: Tensor>(m: &Maker<T>) {
    let logits = m.float(&[0.0, 0.0, 10.0, 0.0], &[2, 2]);
    let labels = m.ints(&[0.0, 1.0]);
    let ce = logits.crossentropy(&labels).unwrap();
    let expected = [2f64.ln(), 10.0 + (-10f64).exp().ln_1p()];
    assert_values_close(&values(&ce), &expected, "crossentropy");

    let bad = m.ints(&[0.0]);
    assert!(logits.crossentropy(&bad).unwrap_err().is_validation());
}

fn onehot_example<T: Tensor>(m: &Maker<T>) {
    let target = m.float(&[0.0; 12], &[3, 4]);
    let out = target.onehot_like(&m.ints(&[1.0, 0.0, 3.0]), 5.0).unwrap();
    assert_eq!(out.shape(), vec![3, 4]);
    assert_eq!(out.dtype(), target.dtype());
    let expected = [0.0, 5.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0];
    assert_values_close(&values(&out), &expected, "onehot_like");

    let short = m.ints(&[1.0]);
    assert!(target.onehot_like(&short, 1.0).unwrap_err().is_validation());
}

fn pad_examples<T: Tensor>(m: &Maker<T>) {
    let x = m.float(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let padded = x.pad(&[(1, 0), (0, 2)], "constant", 9.0).unwrap();
    assert_eq!(padded.shape(), vec![3, 4]);
    let expected = [9.0, 9.0, 9.0, 9.0, 1.0, 2.0, 9.0, 9.0, 3.0, 4.0, 9.0, 9.0];
    assert_values_close(&values(&padded), &expected, "constant pad");

    assert!(x.pad(&[(1, 1), (1, 1)], "edge", 0.0).unwrap_err().is_validation());
    assert!(x.pad(&[(1, 1)], "constant", 0.0).unwrap_err().is_validation());
    let reflect = x.pad(&[(1, 1), (1, 1)], "reflect", 0.0).unwrap_err();
    assert!(reflect.is_not_implemented());
}

fn index_update_copies<T: Tensor>(m: &Maker<T>) {
    let x = m.float(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let y = x.index_update(&Index::Int(0), 7.0).unwrap();
    assert_eq!(values(&y), vec![7.0, 7.0, 3.0, 4.0]);
    assert_eq!(values(&x), vec![1.0, 2.0, 3.0, 4.0]);

    let col = Index::Tuple(vec![IndexItem::Slice(Slice::full()), IndexItem::Int(-1)]);
    let z = x.index_update(&col, &m.float(&[0.0, 0.0], &[2])).unwrap();
    assert_eq!(values(&z), vec![1.0, 0.0, 3.0, 0.0]);
    assert_eq!(values(&x.index(&col).unwrap()), vec![2.0, 4.0]);
}

fn boolean_ops_reject_non_bool<T: Tensor>(m: &Maker<T>) {
    let x = m.float(&[0.0, 1.0], &[2]);
    for err in [
        x.all(Axes::All, false).unwrap_err(),
        x.any(Axes::All, false).unwrap_err(),
        x.logical_not().unwrap_err(),
        x.logical_and(&x).unwrap_err(),
        x.logical_or(&x).unwrap_err(),
    ] {
        assert!(matches!(err, TensorError::NotBool { .. }), "unexpected error {err}");
    }
    let b = x.bool().unwrap();
    assert_eq!(b.any(Axes::All, false).unwrap().item().unwrap(), 1.0);
    assert_eq!(b.all(Axes::All, false).unwrap().item().unwrap(), 0.0);
}

fn bool_cast_normalizes_nonzero<T: Tensor>(m: &Maker<T>) {
    let b = m.float(&[0.0, 2.0, 1.0], &[3]).bool().unwrap();
    assert_eq!(values(&b), vec![0.0, 1.0, 1.0]);
    assert_eq!(b.sum(Axes::All, false).unwrap().item().unwrap(), 2.0);
    let other = m.float(&[0.0, 1.0, 1.0], &[3]).bool().unwrap();
    assert_eq!(values(&b.eq(&other).unwrap()), vec![1.0, 1.0, 1.0]);
}

fn logical_ops_accept_scalars<T: Tensor>(m: &Maker<T>) {
    let b = m.float(&[0.0, 1.0], &[2]).bool().unwrap();
    let and = b.logical_and(1.0).unwrap();
    assert_eq!(and.dtype(), b.dtype());
    assert_eq!(values(&and), vec![0.0, 1.0]);
    assert_eq!(values(&b.logical_and(0.0).unwrap()), vec![0.0, 0.0]);
    assert_eq!(values(&b.logical_or(0.0).unwrap()), vec![0.0, 1.0]);
    assert_eq!(values(&b.logical_or(3.0).unwrap()), vec![1.0, 1.0]);
}

fn wrap_round_trip<T: Tensor>(m: &Maker<T>) {
    let x = m.float(&[1.5, -2.0, 0.25], &[3]);
    let back = T::wrap(x.clone().into_native());
    assert_eq!(back.shape(), x.shape());
    assert_eq!(back.dtype(), x.dtype());
    assert_eq!(values(&back), values(&x));
}

fn check_all<T: Tensor>(m: &Maker<T>) {
    softmax_properties(m);
    crossentropy_example(m);
    onehot_example(m);
    pad_examples(m);
    index_update_copies(m);
    boolean_ops_reject_non_bool(m);
    bool_cast_normalizes_nonzero(m);
    logical_ops_accept_scalars(m);
    wrap_round_trip(m);
}

// ============================================================================
// ndarray backend (always runs)
// ============================================================================

#[test]
fn test_properties_ndarray() {
    check_all(&ndarray_maker());
}

#[test]
fn test_gradients_not_implemented_ndarray() {
    let x = ndarray_maker().float(&[1.0], &[1]);
    let err = x.value_and_grad(|x| x.sum(Axes::All, false)).unwrap_err();
    assert!(err.is_not_implemented());
}

// ============================================================================
// candle backend
// ============================================================================

#[cfg(feature = "candle")]
mod candle {
    use super::*;

    #[test]
    fn test_properties_candle() {
        check_all(&candle_maker());
    }

    #[test]
    fn test_value_and_grad_fn_candle() {
        let x = candle_maker().float(&[1.0, 2.0], &[2]);
        let f = bento::backend::value_and_grad_fn(|x: &bento::backend::candle::CandleTensor| {
            x.square()?.mul(3.0)?.sum(Axes::All, false)
        });
        let (loss, grad) = f(&x).unwrap();
        assert_values_close(&values(&loss), &[15.0], "loss");
        assert_values_close(&values(&grad), &[6.0, 12.0], "grad");
    }

    /// The same operation on both backends gives the same values
    fn parity<N, C>(name: &str, input: &[f64], shape: &[usize], nd: N, cd: C)
    where
        N: Fn(&NdArrayTensor) -> bento::Result<NdArrayTensor>,
        C: Fn(&bento::backend::candle::CandleTensor) -> bento::Result<bento::backend::candle::CandleTensor>,
    {
        let a = nd(&ndarray_maker().float(input, shape)).unwrap();
        let b = cd(&candle_maker().float(input, shape)).unwrap();
        assert_eq!(a.shape(), b.shape(), "{name}: shape mismatch");
        assert_values_close(&values(&b), &values(&a), name);
    }

    macro_rules! parity {
        ($name:expr, $input:expr, $shape:expr, |$x:ident| $body:expr) => {
            parity($name, $input, $shape, |$x| $body, |$x| $body)
        };
    }

    #[test]
    fn test_unsigned_neg_is_rejected() {
        let mask = candle_maker().float(&[1.0, 0.0], &[2]).bool().unwrap();
        assert!(mask.neg().unwrap_err().is_validation());
        let signed = ndarray_maker().ints(&[1.0, -2.0]).neg().unwrap();
        assert_eq!(values(&signed), vec![-1.0, 2.0]);
    }

    #[test]
    fn test_numerical_parity() {
        let data = [0.5, -1.5, 2.0, 0.0, 3.0, -0.25];
        let shape = [2, 3];
        parity!("exp", &data, &shape, |x| x.exp());
        parity!("tanh", &data, &shape, |x| x.tanh());
        parity!("abs", &data, &shape, |x| x.abs());
        parity!("clip", &data, &shape, |x| x.clip(-1.0, 1.0));
        parity!("sum", &data, &shape, |x| x.sum(0, false));
        parity!("mean", &data, &shape, |x| x.mean(Axes::All, true));
        parity!("max", &data, &shape, |x| x.max(-1, false));
        parity!("argmax", &data, &shape, |x| x.argmax(Some(1)));
        parity!("argsort", &data, &shape, |x| x.argsort(-1));
        parity!("cumsum", &data, &shape, |x| x.cumsum(Some(1)));
        parity!("transpose", &data, &shape, |x| x.transpose(None));
        parity!("flip", &data, &shape, |x| x.flip(0));
        parity!("tile", &data, &shape, |x| x.tile(&[2, 1]));
        parity!("softmax", &data, &shape, |x| x.softmax(0));
        parity!("lt", &data, &shape, |x| x.lt(0.5));
        parity!("index", &data, &shape, |x| x.index(&Index::Slice(Slice::new(Some(-1), None, None))));
        parity!("reflect", &data, &[1, 2, 3], |x| x.pad(&[(0, 0), (1, 1), (2, 0)], "reflect", 0.0));
    }
}
