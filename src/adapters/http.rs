//! Ad-hoc HTTP client for the serial `R` diagnostic verb.
//!
//! On ESP-IDF this wraps the IDF HTTP client C API; responses are
//! truncated to a small buffer because the verb exists to poke endpoints
//! from the bench, not to transfer data.
//!
//! On host/test the next response is injected with `sim_set_http_response`.

use crate::ports::{HttpError, HttpFetch};

/// Longest response body kept; the rest is discarded.
const MAX_BODY: usize = 512;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::sys::*;

    #[derive(Default)]
    pub struct Esp32Http;

    impl Esp32Http {
        pub fn new() -> Self {
            Self
        }
    }

    impl HttpFetch for Esp32Http {
        fn get_text(&mut self, url: &str) -> Result<String, HttpError> {
            let mut url_z = String::with_capacity(url.len() + 1);
            url_z.push_str(url);
            url_z.push('\0');

            let mut config: esp_http_client_config_t = unsafe { core::mem::zeroed() };
            config.url = url_z.as_ptr().cast();

            // SAFETY: config points at a NUL-terminated URL that outlives
            // the client; the handle is cleaned up on every path.
            unsafe {
                let client = esp_http_client_init(&config);
                if client.is_null() {
                    return Err(HttpError::Connect);
                }

                let result = (|| {
                    if esp_http_client_open(client, 0) != ESP_OK {
                        return Err(HttpError::Connect);
                    }
                    if esp_http_client_fetch_headers(client) < 0 {
                        return Err(HttpError::BadResponse);
                    }
                    let mut body = vec![0u8; MAX_BODY];
                    let n = esp_http_client_read(
                        client,
                        body.as_mut_ptr().cast(),
                        body.len() as i32,
                    );
                    if n < 0 {
                        return Err(HttpError::BadResponse);
                    }
                    body.truncate(n as usize);
                    String::from_utf8(body).map_err(|_| HttpError::BadResponse)
                })();

                esp_http_client_cleanup(client);
                result
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32Http;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use std::sync::Mutex;

    static SIM_RESPONSE: Mutex<Option<Result<String, HttpError>>> = Mutex::new(None);

    /// Set the response returned by the next `get_text` call.
    pub fn sim_set_http_response(response: Result<String, HttpError>) {
        if let Ok(mut slot) = SIM_RESPONSE.lock() {
            *slot = Some(response);
        }
    }

    #[derive(Default)]
    pub struct SimHttp;

    impl SimHttp {
        pub fn new() -> Self {
            Self
        }
    }

    impl HttpFetch for SimHttp {
        fn get_text(&mut self, _url: &str) -> Result<String, HttpError> {
            match SIM_RESPONSE.lock() {
                Ok(mut slot) => match slot.take() {
                    Some(Ok(mut body)) => {
                        body.truncate(MAX_BODY);
                        Ok(body)
                    }
                    Some(Err(e)) => Err(e),
                    None => Err(HttpError::Connect),
                },
                Err(_) => Err(HttpError::Connect),
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_set_http_response, SimHttp};

/// The HTTP backend for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultHttp = Esp32Http;
#[cfg(not(target_os = "espidf"))]
pub type DefaultHttp = SimHttp;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn injected_response_is_returned_once() {
        let mut http = SimHttp::new();
        sim_set_http_response(Ok("pong".into()));
        assert_eq!(http.get_text("http://boat32/ping").unwrap(), "pong");
        assert!(http.get_text("http://boat32/ping").is_err());
    }
}
