pub mod pane_chrome;
pub mod scrollable_list;
pub mod search_input;
pub mod status_bar;
pub mod toast;
pub mod text;
