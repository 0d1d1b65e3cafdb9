#[cfg(test)]
pub mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use confique::Config;
    use serde::Serialize;

    use crate::error::ConfigError;
    use crate::factory::{AnyConfiguration, ConfigurationFactory, ConfigurationType, Context};
    use crate::field::Field;
    use crate::loader::SpecificationLoader;
    use crate::spec::Specification;
    use crate::values;

    // -- Plain configuration types ----------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct DatabaseConfig {
        pub url: String,
        pub pool_size: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    pub fn database_factory() -> crate::SingleTypeFactory<DatabaseConfig> {
        crate::SingleTypeFactory::new(|spec| {
            let url = values::parse_string(spec, ["url"])?;
            let pool_size = values::parse_int(spec, ["pool_size"])?;
            let pool_size = u32::try_from(pool_size).map_err(|e| {
                ConfigError::invalid_setting_caused_by(spec, Field::from(["pool_size"]), e)
            })?;
            Ok(DatabaseConfig { url, pool_size })
        })
    }

    pub fn server_factory() -> crate::SingleTypeFactory<ServerConfig> {
        crate::SingleTypeFactory::new(|spec| {
            Ok(ServerConfig {
                host: values::parse_string(spec, ["host"])?,
                port: values::parse_value(spec, ["port"])?,
            })
        })
    }

    // -- confique fixture -------------------------------------------------------

    #[derive(Config, Serialize, Debug, PartialEq)]
    pub struct TestConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080)]
        pub port: u16,

        /// Enable debug mode.
        #[config(default = false)]
        pub debug: bool,

        /// Database settings.
        #[config(nested)]
        pub database: TestDbConfig,
    }

    #[derive(Config, Serialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    /// A confique struct with a required field, so it has no default.
    #[derive(Config, Debug, PartialEq)]
    pub struct RequiredConfig {
        pub token: String,

        #[config(default = 3)]
        pub retries: u32,
    }

    #[test]
    fn test_config_loads_defaults() {
        let config = TestConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- Instrumented loaders and factories -------------------------------------

    /// A shared call counter.
    #[derive(Debug, Clone, Default)]
    pub struct Counter(Arc<AtomicUsize>);

    impl Counter {
        pub fn bump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        pub fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Counts `load_specification` calls on the wrapped loader.
    pub struct CountingLoader<L> {
        inner: L,
        loads: Counter,
    }

    impl<L: SpecificationLoader> CountingLoader<L> {
        pub fn new(inner: L) -> Self {
            CountingLoader {
                inner,
                loads: Counter::default(),
            }
        }

        pub fn loads(&self) -> Counter {
            self.loads.clone()
        }
    }

    impl<L: SpecificationLoader> SpecificationLoader for CountingLoader<L> {
        fn has_specification(&self, name: &str) -> bool {
            self.inner.has_specification(name)
        }

        fn load_specification(&self, name: &str) -> Result<Specification, ConfigError> {
            self.loads.bump();
            self.inner.load_specification(name)
        }
    }

    /// Claims one name and always fails to parse it.
    pub struct FailingLoader {
        name: String,
    }

    impl FailingLoader {
        pub fn new(name: &str) -> Self {
            FailingLoader { name: name.into() }
        }
    }

    impl SpecificationLoader for FailingLoader {
        fn has_specification(&self, name: &str) -> bool {
            self.name == name
        }

        fn load_specification(&self, name: &str) -> Result<Specification, ConfigError> {
            Err(ConfigError::SpecificationFormat {
                name: name.into(),
                source: "broken document".into(),
            })
        }
    }

    /// Counts `create_*` calls on the wrapped factory.
    pub struct CountingFactory<F> {
        inner: F,
        creates: Counter,
    }

    impl<F: ConfigurationFactory> CountingFactory<F> {
        pub fn new(inner: F) -> Self {
            CountingFactory {
                inner,
                creates: Counter::default(),
            }
        }

        pub fn creates(&self) -> Counter {
            self.creates.clone()
        }
    }

    impl<F: ConfigurationFactory> ConfigurationFactory for CountingFactory<F> {
        fn supports_configuration(&self, configuration_type: &ConfigurationType) -> bool {
            self.inner.supports_configuration(configuration_type)
        }

        fn create_configuration(
            &self,
            specification: &Specification,
            configuration_type: &ConfigurationType,
            context: Option<&Context>,
        ) -> Result<AnyConfiguration, ConfigError> {
            self.creates.bump();
            self.inner
                .create_configuration(specification, configuration_type, context)
        }

        fn supports_default_configuration(&self, configuration_type: &ConfigurationType) -> bool {
            self.inner.supports_default_configuration(configuration_type)
        }

        fn create_default_configuration(
            &self,
            configuration_type: &ConfigurationType,
        ) -> Result<AnyConfiguration, ConfigError> {
            self.creates.bump();
            self.inner.create_default_configuration(configuration_type)
        }

        fn configuration_types(&self) -> Vec<ConfigurationType> {
            self.inner.configuration_types()
        }
    }
}
