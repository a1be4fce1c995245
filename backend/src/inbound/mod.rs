//! Inbound adapters translating external requests into calls on the
//! progression driving ports.

pub mod http;
