//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Bot Assistente".to_string()
}

pub fn default_data_dir() -> String {
    "~/.atende".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_reply_delay_ms() -> u64 {
    3000
}

pub fn default_true() -> bool {
    true
}

pub fn default_session_key() -> String {
    "default_session".to_string()
}

pub fn default_session_table() -> String {
    "whatsapp_sessions".to_string()
}

pub fn default_sqlite_path() -> String {
    "~/.atende/data/sessions.db".to_string()
}

pub fn default_email_base_url() -> String {
    "https://api.brevo.com".to_string()
}

pub fn default_email_subject() -> String {
    "QR Code para Conectar o Bot".to_string()
}

pub fn default_to_name() -> String {
    "Usuário".to_string()
}

pub fn default_bridge_command() -> String {
    "node".to_string()
}

pub fn default_bridge_script() -> String {
    "~/.atende/bridge/bridge.js".to_string()
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}
