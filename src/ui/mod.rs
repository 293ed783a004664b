pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, section, status, success, timing};
pub use progress::Spinner;
pub use table::totals_table;
pub use theme::{Theme, theme};
