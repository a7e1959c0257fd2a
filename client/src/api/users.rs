use shared::{AppUser, CreateUserRequest, UpdateUserRequest};

use super::endpoints;
use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone)]
pub struct UsersApi {
    http: HttpClient,
}

impl UsersApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self) -> Result<Vec<AppUser>, ApiError> {
        self.http.get(endpoints::USERS).await
    }

    pub async fn get(&self, id: &str) -> Result<AppUser, ApiError> {
        self.http.get(&endpoints::user(id)).await
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<AppUser, ApiError> {
        self.http.post(endpoints::USERS, request).await
    }

    pub async fn update(&self, id: &str, request: &UpdateUserRequest) -> Result<AppUser, ApiError> {
        self.http.put(&endpoints::user(id), request).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.http.delete(&endpoints::user(id)).await?;
        Ok(())
    }
}
