// src/models/auth.rs

use serde::{Deserialize, Serialize};

// Estrutura de dados ("claims") dentro do JWT emitido pelo provedor de identidade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,             // Subject (ID do usuário)
    pub name: Option<String>, // Nome de exibição, quando vier
    pub exp: usize,
    pub iat: usize,
}
