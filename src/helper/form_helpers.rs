use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use url::form_urlencoded;

/// Parses URL-encoded form data from bytes, handling potential UTF-8 errors
/// gracefully. Repeated keys keep the last value; use `parse_form_values`
/// for multi-valued fields.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<HashMap<String, String>, HttpResponse> {
    let body = match String::from_utf8(form_bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

/// Collects every value submitted under one key (checkbox lists such as
/// `post_ids`).
pub fn parse_form_values(
    form_bytes: &web::Bytes,
    key: &str,
) -> Result<Vec<String>, HttpResponse> {
    let body = match String::from_utf8(form_bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_are_collected_in_order() {
        let bytes = web::Bytes::from_static(b"action=approve&post_ids=3&post_ids=7&post_ids=11");
        let form = parse_form(&bytes).unwrap();
        assert_eq!(form.get("action").map(String::as_str), Some("approve"));

        let ids = parse_form_values(&bytes, "post_ids").unwrap();
        assert_eq!(ids, ["3", "7", "11"]);
        assert!(parse_form_values(&bytes, "missing").unwrap().is_empty());
    }
}
