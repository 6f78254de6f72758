// FICHIER : src-core/src/utils/macros.rs

/// Affiche une info à l'utilisateur et logue l'événement
#[macro_export]
macro_rules! user_info {
    ($key:expr) => {{
        println!("{}", $key);
        tracing::info!(event = "user_notification", key = $key);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("{}", msg);
        tracing::info!(event = "user_notification", key = $key, message = %msg);
    }};
}

/// Affiche un succès à l'utilisateur
#[macro_export]
macro_rules! user_success {
    ($key:expr) => {{
        println!("✅ {}", $key);
        tracing::info!(event = "user_success", key = $key);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("✅ {}", msg);
        tracing::info!(event = "user_success", key = $key, message = %msg);
    }};
}

/// Affiche une erreur à l'utilisateur ET logue la structure technique
#[macro_export]
macro_rules! user_error {
    ($key:expr, error = $err:expr, component = $comp:expr) => {{
        eprintln!("❌ [{}] {}", $comp, $err);
        tracing::error!(
            service = "morphfit", componentName = $comp, error = ?$err,
            event = "user_error", key = $key
        );
    }};
    ($key:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("❌ {}", msg);
        tracing::error!(event = "user_error", key = $key, message = %msg);
    }};
}
