pub mod header;
pub mod help_overlay;
pub mod log_panel;
pub mod queue_panel;
pub mod results_list;
