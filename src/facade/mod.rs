pub mod accessibility;
pub mod capture;
pub mod input;
pub mod native;
pub mod process;
pub mod selector;
pub mod shapes;
pub mod traits;
pub mod types;

pub use native::NativeDesktop;
pub use selector::Selector;
pub use traits::Desktop;
pub use types::{CommandOutput, ElementRole, MouseButton, Point, ScreenMeta, Screenshot, UiElement};
