use evloop_scheduler::IoOperation;

/// Stand-in for an outbound HTTPS GET. No request leaves the process; the
/// operation answers with a fixed status once the loop completes it.
#[derive(Debug, Clone)]
pub struct HttpGet {
    pub url: String,
    pub verify_tls: bool,
    status: u16,
    label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
}

impl HttpGet {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let label = format!("GET {url}");
        Self {
            url,
            verify_tls: true,
            status: 200,
            label,
        }
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn respond_with(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl IoOperation for HttpGet {
    type Output = HttpResponse;

    fn label(&self) -> &str {
        &self.label
    }

    fn perform(self) -> HttpResponse {
        tracing::debug!(url = %self.url, verify_tls = self.verify_tls, status = self.status, "simulated request");
        HttpResponse {
            status: self.status,
        }
    }
}
