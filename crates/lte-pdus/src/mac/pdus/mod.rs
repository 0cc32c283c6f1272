pub mod dl_sch_pdu;
pub mod rar_pdu;
