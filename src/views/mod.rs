pub mod whitelist_button;
pub mod whitelist_page;
