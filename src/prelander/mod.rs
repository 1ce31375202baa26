pub mod resolver;

pub use resolver::{
    Background, ConfigResolver, ImageRatio, Logo, LogoPosition, MainImage, ResolveError,
    ResolveTarget, ResolvedPrelander, TextAlign,
};
