//! URL 辅助函数

use std::collections::HashMap;

use url::Url;

use crate::error::{AppError, Result};

/// 课程 key 缺省值
pub const DEFAULT_COURSE_KEY: &str = "default";

/// 把课件链接拼成绝对地址，并确保带有 `fullscreen=1`
pub fn fullscreen_url(base: &str, href: &str) -> Result<String> {
    let base_url = Url::parse(base).map_err(|e| AppError::navigation_failed(base, e))?;
    let mut url = base_url
        .join(href)
        .map_err(|e| AppError::navigation_failed(href, e))?;

    let has_fullscreen = url.query_pairs().any(|(k, _)| k == "fullscreen");
    if !has_fullscreen {
        url.query_pairs_mut().append_pair("fullscreen", "1");
    }
    Ok(url.to_string())
}

/// 解析查询参数；无法解析时返回空
pub fn query_params(raw: &str) -> HashMap<String, String> {
    Url::parse(raw)
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// 两个地址是否指向同一个端点（协议 + 主机 + 端口 + 路径）
pub fn same_endpoint(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.origin() == b.origin()
                && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
        }
        _ => false,
    }
}

/// 两个地址是否在同一主机上
pub fn same_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.host_str().is_some() && a.host_str() == b.host_str(),
        _ => false,
    }
}

/// 当前地址的路径部分
pub fn path_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(|url| url.path().to_string())
}

/// 课程 key：课程链接路径的最后一段
pub fn course_key_from_href(href: Option<&str>) -> String {
    href.map(|h| h.split(['?', '#']).next().unwrap_or_default())
        .and_then(|path| {
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .next_back()
        })
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| DEFAULT_COURSE_KEY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullscreen_url_joins_relative_href() {
        let url = fullscreen_url("https://lms.ptit.edu.vn/", "/slides/slide/gioi-thieu-101").unwrap();
        assert_eq!(
            url,
            "https://lms.ptit.edu.vn/slides/slide/gioi-thieu-101?fullscreen=1"
        );
    }

    #[test]
    fn test_fullscreen_url_keeps_existing_flag() {
        let url = fullscreen_url(
            "https://lms.ptit.edu.vn/",
            "https://lms.ptit.edu.vn/slides/slide/bai-1-5?fullscreen=1",
        )
        .unwrap();
        assert_eq!(url.matches("fullscreen").count(), 1);
    }

    #[test]
    fn test_same_endpoint_ignores_query() {
        assert!(same_endpoint(
            "https://lms.ptit.edu.vn/auth_oauth/signin?state=x&access_token=t",
            "https://lms.ptit.edu.vn/auth_oauth/signin"
        ));
        assert!(!same_endpoint(
            "http://lms.ptit.edu.vn/auth_oauth/signin",
            "https://lms.ptit.edu.vn/auth_oauth/signin"
        ));
    }

    #[test]
    fn test_same_host() {
        let login = "https://slinkid.ptit.edu.vn/auth/realms/master/protocol/openid-connect/auth?client_id=lms_ptit";
        assert!(same_host(
            "https://slinkid.ptit.edu.vn/auth/realms/master/login-actions/authenticate",
            login
        ));
        assert!(!same_host("https://lms.ptit.edu.vn/web", login));
        assert!(!same_host("about:blank", "about:blank"));
    }

    #[test]
    fn test_query_params() {
        let params = query_params("https://lms.ptit.edu.vn/auth_oauth/signin?access_token=abc&state=%7B%7D");
        assert_eq!(params.get("access_token").map(String::as_str), Some("abc"));
        assert_eq!(params.get("state").map(String::as_str), Some("{}"));
    }

    #[test]
    fn test_course_key() {
        assert_eq!(
            course_key_from_href(Some("/slides/co-so-du-lieu-12")),
            "co-so-du-lieu-12"
        );
        assert_eq!(
            course_key_from_href(Some("https://lms.ptit.edu.vn/slides/mang-may-tinh-7/?x=1")),
            "mang-may-tinh-7"
        );
        assert_eq!(course_key_from_href(Some("/")), DEFAULT_COURSE_KEY);
        assert_eq!(course_key_from_href(None), DEFAULT_COURSE_KEY);
    }
}
