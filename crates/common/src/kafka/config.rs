use rdkafka::ClientConfig;

/// Connection settings shared by the producer and consumer clients.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub brokers: String,
    pub topic: String,
    pub sasl_username: String,
    pub sasl_password: String,
}

impl KafkaSettings {
    /// Base client configuration. When both SASL credentials are present the
    /// client speaks SCRAM-SHA-512 over TLS; otherwise it dials plaintext.
    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("socket.timeout.ms", "10000");

        if !self.sasl_username.is_empty() && !self.sasl_password.is_empty() {
            config
                .set("security.protocol", "sasl_ssl")
                .set("sasl.mechanisms", "SCRAM-SHA-512")
                .set("sasl.username", &self.sasl_username)
                .set("sasl.password", &self.sasl_password);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> KafkaSettings {
        KafkaSettings {
            brokers: "localhost:9092".to_string(),
            topic: "test-topic".to_string(),
            sasl_username: String::new(),
            sasl_password: String::new(),
        }
    }

    #[test]
    fn test_plaintext_without_credentials() {
        let config = settings().client_config();
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(config.get("security.protocol"), None);
    }

    #[test]
    fn test_scram_over_tls_with_credentials() {
        let config = KafkaSettings {
            sasl_username: "user".to_string(),
            sasl_password: "pass".to_string(),
            ..settings()
        }
        .client_config();

        assert_eq!(config.get("security.protocol"), Some("sasl_ssl"));
        assert_eq!(config.get("sasl.mechanisms"), Some("SCRAM-SHA-512"));
    }

    #[test]
    fn test_partial_credentials_stay_plaintext() {
        let config = KafkaSettings {
            sasl_username: "user".to_string(),
            ..settings()
        }
        .client_config();

        assert_eq!(config.get("security.protocol"), None);
    }
}
