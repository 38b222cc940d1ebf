pub mod banner;
pub mod output;
pub mod tui;

/// Prints the welcome banner. Call once before the interactive menu.
pub fn init_ui() {
    banner::print_welcome();
}
