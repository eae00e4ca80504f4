use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid date: {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("{0} out of range")]
    OutOfRange(&'static str),
}

#[derive(Debug, Error)]
pub enum AstroError {
    #[error("Chave da API inválida ou expirada")]
    Authentication,
    #[error("Limite de requisições excedido. Tente novamente em alguns minutos.")]
    RateLimited,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    UpstreamStatus(u16),
    #[error("malformed response: {0}")]
    MalformedBody(String),
    #[error("Todos os endpoints falharam ({attempts} tentativas). Último erro: {last}")]
    AllEndpointsFailed { attempts: usize, last: String },
}

impl AstroError {
    /// Terminal errors are not retried against the remaining endpoints.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AstroError::Authentication | AstroError::RateLimited)
    }
}
