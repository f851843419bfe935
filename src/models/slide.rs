use std::collections::HashMap;
use std::fmt;

/// 课件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideType {
    Video,
    Quiz,
    Text,
    /// 页面上出现的其他 data-type
    Other(String),
}

impl SlideType {
    /// 从侧边栏的 data-type 属性解析
    pub fn from_attribute(value: &str) -> Self {
        match value.trim() {
            "video" => SlideType::Video,
            "quiz" => SlideType::Quiz,
            "text" => SlideType::Text,
            other => SlideType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SlideType::Video => "video",
            SlideType::Quiz => "quiz",
            SlideType::Text => "text",
            SlideType::Other(other) => other,
        }
    }
}

impl fmt::Display for SlideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 课程中的一个课件
///
/// `completed` 只是抓取时的快照。
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub slide_type: SlideType,
    /// 0 = 未完成, 1 = 已完成
    pub completed: u8,
    pub access_allowed: bool,
    pub href: String,
    pub embed_code: Option<String>,
}

impl Slide {
    /// 从侧边栏条目的属性构建课件
    ///
    /// 对应 `.o_wslides_fs_sidebar_list_item` 上的 data-* 属性。
    pub fn from_sidebar_attributes(attributes: &HashMap<String, String>, lms_domain: &str) -> Self {
        let attr = |name: &str| {
            attributes
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let slug = attr("data-slug").unwrap_or_default();
        let href = format!(
            "{}/slides/slide/{}?fullscreen=1",
            lms_domain.trim_end_matches('/'),
            slug
        );

        Self {
            id: attr("data-id").unwrap_or_default(),
            slide_type: SlideType::from_attribute(&attr("data-type").unwrap_or_default()),
            title: attr("data-name"),
            href,
            slug,
            access_allowed: attr("data-can-access").as_deref() == Some("True"),
            embed_code: attr("data-embed-code"),
            completed: attr("data-completed")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed == 1
    }

    /// 日志中显示的名称
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.slug)
    }
}
