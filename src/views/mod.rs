pub mod state;
pub mod tui;
pub mod widgets;

pub use state::{ModalState, UiState};
pub use widgets::StatefulList;
