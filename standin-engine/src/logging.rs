//! Logging utilities for doubles and module substitutions.

use slog::Logger;

/// Extension trait for `slog::Logger`
pub trait LoggerExtensions {
    /// Create a new child logger with a `src` key containing the component name.
    fn new_with_component_name<T>(&self) -> Self;

    /// Create a new child logger with a `src` key containing the provided name.
    fn new_with_name(&self, name: &str) -> Self;
}

impl LoggerExtensions for Logger {
    fn new_with_component_name<T>(&self) -> Self {
        self.new_with_name(component_name::<T>())
    }

    fn new_with_name(&self, name: &str) -> Self {
        self.new(slog::o!("src" => name.to_owned()))
    }
}

/// A logger discarding every record, used by components built without a logger.
pub fn discard_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

fn component_name<T>() -> &'static str {
    let complete_name = std::any::type_name::<T>();
    let without_generic = complete_name.split('<').next().unwrap_or(complete_name);
    without_generic.rsplit("::").next().unwrap_or(complete_name)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use slog::{info, Drain};

    use crate::double::Double;
    use crate::module_registry::ModuleRegistry;

    use super::*;

    struct TestStruct;
    struct TestStructWithGeneric<T> {
        _phantom: std::marker::PhantomData<T>,
    }

    mod test_mod {
        pub struct ScopedTestStruct;
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn buffered_logger(buffer: SharedBuffer) -> Logger {
        let decorator = slog_term::PlainSyncDecorator::new(buffer);
        let drain = slog_term::CompactFormat::new(decorator).build();
        Logger::root(Mutex::new(drain).fuse(), slog::o!())
    }

    #[test]
    fn extract_component_name_remove_namespaces() {
        assert_eq!("TestStruct", component_name::<TestStruct>());
        assert_eq!(
            "ScopedTestStruct",
            component_name::<test_mod::ScopedTestStruct>()
        );
        assert_eq!(
            "TestStructWithGeneric",
            component_name::<TestStructWithGeneric<test_mod::ScopedTestStruct>>()
        );
        assert_eq!("Double", component_name::<Double>());
        assert_eq!("ModuleRegistry", component_name::<ModuleRegistry>());
    }

    #[test]
    fn logger_extension_new_with_name() {
        let buffer = SharedBuffer::default();
        {
            let child_logger = buffered_logger(buffer.clone()).new_with_name("my name");
            info!(child_logger, "Child log");
        }

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(
            logs.contains("src") && logs.contains("my name"),
            "log should contain `src` key for `my name`, logs:\n{logs}"
        );
    }
}
