//! # TUI Components
//!
//! Stateless, props-based components. Each receives everything it draws as
//! struct fields and renders into the area it is given:
//!
//! - `TitleBar`: mode and the outcome of the last request
//! - `StackView`: one navigator's stack, topmost view first
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── title_bar.rs     (Top status bar)
//! └── stack_view.rs    (Navigator stack)
//! ```

mod stack_view;
mod title_bar;

pub use stack_view::{StackRow, StackView};
pub use title_bar::TitleBar;
