//! Output macros for the osnap CLI.
//!
//! User-facing lines (the run summary, fatal errors) go through these macros so
//! every crate prints with the same symbols. Diagnostic logging uses `tracing`.

#[macro_export]
macro_rules! osnap_println {
    () => {
        println!();
    };
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! osnap_error {
    ($($arg:tt)*) => {
        eprintln!("❌ {}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! osnap_error_with_details {
    ($main:expr, $details:expr) => {
        eprintln!("❌ {}", $main);
        for detail in $details {
            eprintln!("   └─ {}", detail);
        }
    };
}

#[macro_export]
macro_rules! osnap_success {
    ($($arg:tt)*) => {
        println!("✓ {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! osnap_warning {
    ($($arg:tt)*) => {
        eprintln!("⚠ {}", format!($($arg)*));
    };
}
