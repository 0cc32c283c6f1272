pub mod dl_lcid;
pub mod rar_subheader_type;
