pub mod mcp4725;
