//! Feed-forward modules
mod activation;
mod conv;
mod linear;
mod mlp;

pub use activation::Activation;
pub use conv::{conv_output_len, Conv2d, Conv2dConfig};
pub use linear::{Linear, LinearConfig};
pub use mlp::{Mlp, MlpConfig};
