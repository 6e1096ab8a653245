pub mod frame;
pub mod request_params;
