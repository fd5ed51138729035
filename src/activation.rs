//! Activation functions for NCPS cells
//!
//! Burn ships the common activations as free functions; this module adds
//! LeCun's scaled tanh and a name-addressable [`Activation`] enum so cells can
//! be configured from strings and config files.

use std::fmt;
use std::str::FromStr;

use burn::tensor::{activation, backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::NcpsError;

/// LeCun's tanh activation function.
///
/// This activation function is defined as:
/// `f(x) = 1.7159 * tanh(0.666 * x)`
///
/// The scaling factors keep the function close to the identity near the
/// origin and bound the output to roughly [-1.7159, 1.7159].
///
/// # Example
///
/// ```rust
/// use burn::backend::NdArray;
/// use burn::tensor::Tensor;
/// use ncps::activation::LeCun;
///
/// type Backend = NdArray<f32>;
/// let device = Default::default();
///
/// let x = Tensor::<Backend, 1>::from_floats([0.0, 1.0, -1.0], &device);
/// let y = LeCun::forward(x);
/// ```
pub struct LeCun;

impl LeCun {
    /// Applies the LeCun tanh activation element-wise.
    pub fn forward<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
        let scaled = x * 0.666f32;
        scaled.tanh() * 1.7159f32
    }
}

/// Applies LeCun activation to a tensor.
pub trait LeCunActivation {
    /// Applies LeCun activation
    fn lecun(self) -> Self;
}

impl<B: Backend, const D: usize> LeCunActivation for Tensor<B, D> {
    fn lecun(self) -> Self {
        LeCun::forward(self)
    }
}

/// Element-wise activation selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Tanh,
    Relu,
    Gelu,
    Silu,
    Sigmoid,
    #[serde(rename = "lecun_tanh")]
    LeCunTanh,
    #[serde(alias = "identity")]
    Linear,
}

impl Activation {
    pub const ALL: [Activation; 7] = [
        Activation::Tanh,
        Activation::Relu,
        Activation::Gelu,
        Activation::Silu,
        Activation::Sigmoid,
        Activation::LeCunTanh,
        Activation::Linear,
    ];

    pub fn apply<B: Backend, const D: usize>(self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => activation::relu(x),
            Activation::Gelu => activation::gelu(x),
            Activation::Silu => activation::silu(x),
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::LeCunTanh => LeCun::forward(x),
            Activation::Linear => x,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::Gelu => "gelu",
            Activation::Silu => "silu",
            Activation::Sigmoid => "sigmoid",
            Activation::LeCunTanh => "lecun_tanh",
            Activation::Linear => "linear",
        }
    }

    /// Compact encoding stored inside modules (Burn records only carry primitives).
    pub(crate) fn code(self) -> u8 {
        match self {
            Activation::Tanh => 0,
            Activation::Relu => 1,
            Activation::Gelu => 2,
            Activation::Silu => 3,
            Activation::Sigmoid => 4,
            Activation::LeCunTanh => 5,
            Activation::Linear => 6,
        }
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => Activation::Relu,
            2 => Activation::Gelu,
            3 => Activation::Silu,
            4 => Activation::Sigmoid,
            5 => Activation::LeCunTanh,
            6 => Activation::Linear,
            _ => Activation::Tanh,
        }
    }
}

impl FromStr for Activation {
    type Err = NcpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            "gelu" => Ok(Activation::Gelu),
            "silu" | "swish" => Ok(Activation::Silu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "lecun_tanh" | "lecun" => Ok(Activation::LeCunTanh),
            "linear" | "identity" => Ok(Activation::Linear),
            other => Err(NcpsError::Activation(format!(
                "{other}. Valid options are {:?}",
                Activation::ALL.map(Activation::name)
            ))),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
