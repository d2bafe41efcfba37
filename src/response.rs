use actix_web::http::StatusCode;
use serde::Serialize;

/// Success envelope: `{statusCode, data, message, success}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(json!({ "a": 1 }), "done")).unwrap();

        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["data"]["a"], 1);
        assert_eq!(body["message"], "done");
        assert_eq!(body["success"], true);
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::new(StatusCode::CREATED, (), "created");
        assert_eq!(response.status_code, 201);
        assert!(response.success);
    }
}
