pub mod backoff_indicator;
pub mod rar_ul_grant;
