mod bookmark;
mod contextual;
mod place;
mod recommendation;
mod similarity;
mod user;
mod vector;
mod weather;

pub use bookmark::*;
pub use contextual::*;
pub use place::*;
pub use recommendation::*;
pub use similarity::*;
pub use user::*;
pub use vector::*;
pub use weather::*;
