pub(crate) fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "enabled" | "on"
        ),
        Err(_) => default,
    }
}

pub(crate) fn env_list(name: &str, fallback: &[&str]) -> Vec<String> {
    let Ok(raw) = std::env::var(name) else {
        return fallback.iter().map(|s| (*s).to_string()).collect();
    };
    let out: Vec<String> = raw
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect();
    if out.is_empty() {
        fallback.iter().map(|s| (*s).to_string()).collect()
    } else {
        out
    }
}
