pub mod functions;
pub mod realtime;
pub mod rest;
pub mod system;
