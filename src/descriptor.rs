use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("surface class name is empty")]
    EmptyClass,
    #[error("surface class name {0:?} is not a single class token")]
    InvalidClass(String),
}

/// Identifies the embedded surface to bridge and how the host addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingDescriptor {
    content_location: Url,
    surface_class: String,
    use_proxy: bool,
}

impl EmbeddingDescriptor {
    pub fn new(
        content_location: Url,
        surface_class: impl Into<String>,
        use_proxy: bool,
    ) -> Result<Self, DescriptorError> {
        let surface_class = surface_class.into();
        if surface_class.is_empty() {
            return Err(DescriptorError::EmptyClass);
        }
        if surface_class
            .chars()
            .any(|c| c.is_whitespace() || c == '.' || c == '"')
        {
            return Err(DescriptorError::InvalidClass(surface_class));
        }

        Ok(Self {
            content_location,
            surface_class,
            use_proxy,
        })
    }

    pub fn content_location(&self) -> &Url {
        &self.content_location
    }

    pub fn surface_class(&self) -> &str {
        &self.surface_class
    }

    pub fn use_proxy(&self) -> bool {
        self.use_proxy
    }

    /// Markup for a full-bleed embedding surface tagged with the class name.
    pub fn render_markup(&self) -> String {
        format!(
            r#"<iframe src="{src}" width="100%" height="100%" title="User Site" class="{class}"></iframe>"#,
            src = html_escape::encode_double_quoted_attribute(self.content_location.as_str()),
            class = html_escape::encode_double_quoted_attribute(&self.surface_class),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn renders_full_bleed_iframe() {
        let descriptor =
            EmbeddingDescriptor::new(url("http://localhost:8000/?a=1&b=2"), "site-frame", true)
                .unwrap();
        assert_eq!(
            descriptor.render_markup(),
            r#"<iframe src="http://localhost:8000/?a=1&amp;b=2" width="100%" height="100%" title="User Site" class="site-frame"></iframe>"#
        );
    }

    #[test]
    fn rejects_unusable_class_names() {
        let location = url("http://localhost:8000/");
        assert_eq!(
            EmbeddingDescriptor::new(location.clone(), "", false).unwrap_err(),
            DescriptorError::EmptyClass
        );
        assert_eq!(
            EmbeddingDescriptor::new(location, "two classes", false).unwrap_err(),
            DescriptorError::InvalidClass("two classes".into())
        );
    }
}
