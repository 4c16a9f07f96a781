use snafu::Snafu;

#[derive(Snafu, Debug, Clone, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum SM2Error {
    #[snafu(display("invalid input: {reason}"))]
    InvalidInput { reason: String },
    #[snafu(display("invalid scheduler config: {reason}"))]
    InvalidConfig { reason: String },
}

pub type Result<T, E = SM2Error> = std::result::Result<T, E>;
