//! Markdown / MDX document translation.
//!
//! Documents go to the model whole. The reply is post-processed so in-page
//! links point at the target locale, then checked for a front matter block
//! with a `title`, which catches replies that are commentary instead of the
//! translated document.

use super::TranslatorSettings;
use crate::error::TranslateError;
use crate::llm::ChatModel;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

static FRONT_MATTER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Inputs for one document translation.
#[derive(Debug, Clone, Copy)]
pub struct TextRequest<'a> {
    pub source: &'a str,
    pub source_locale: &'a str,
    pub source_name: &'a str,
    pub target_locale: &'a str,
    pub target_name: &'a str,
    /// Previous translation to update in place, if any
    pub existing: Option<&'a str>,
    /// Meaningful diff of the source since the previous translation
    pub diff: Option<&'a str>,
}

fn full_system_prompt(source_name: &str, target_name: &str) -> String {
    format!(
        "You are a professional translation engine fluent in many languages. \
         Translate the following text from {} to {}. \
         Preserve the original formatting exactly, including Markdown syntax, \
         line breaks and paragraph structure. \
         Do not add any explanation, commentary or text unrelated to the translation.",
        source_name, target_name
    )
}

fn incremental_system_prompt(source_name: &str, target_name: &str) -> String {
    format!(
        "You are a professional translation engine fluent in many languages \
         who specialises in document updates. \
         Using an old {target} translation as the base, \
         update it so that it matches a new {source} document. \
         Compare the new source carefully and change the old translation as little as possible, \
         keeping its style and terminology consistent. \
         Preserve the original formatting exactly, including Markdown syntax, \
         line breaks and paragraph structure. \
         Return only the complete, updated {target} translation \
         without any explanation or commentary.",
        source = source_name,
        target = target_name
    )
}

fn incremental_user_prompt(request: &TextRequest<'_>, existing: &str) -> String {
    let mut prompt = format!(
        "This is the latest {} document:\n\
         --- [START OF NEW SOURCE] ---\n\
         {}\n\
         --- [END OF NEW SOURCE] ---\n\n",
        request.source_name, request.source
    );
    if let Some(diff) = request.diff {
        prompt.push_str(&format!(
            "These are the changes made to the source since the old translation:\n\
             --- [START OF SOURCE DIFF] ---\n\
             {}\n\
             --- [END OF SOURCE DIFF] ---\n\n",
            diff.trim_end()
        ));
    }
    prompt.push_str(&format!(
        "This is the previous {} translation; update it:\n\
         --- [START OF OLD TRANSLATION] ---\n\
         {}\n\
         --- [END OF OLD TRANSLATION] ---",
        request.target_name, existing
    ));
    prompt
}

/// Rewrite `/source/` locale path segments and terminate a trailing delimiter.
pub fn post_process(text: &str, source_locale: &str, target_locale: &str) -> String {
    let mut text = text.replace(
        &format!("/{}/", source_locale),
        &format!("/{}/", target_locale),
    );
    if text.ends_with("---") {
        text.push('\n');
    }
    text
}

/// Require a leading `---` block that contains a `title:` line.
pub fn validate_front_matter(text: &str) -> Result<(), TranslateError> {
    let regex = FRONT_MATTER_REGEX
        .get_or_init(|| {
            Regex::new(r"\A---[ \t]*\r?\n(?s:.*?)title:(?s:.*?)\n---[ \t]*\r?\n").unwrap()
        });
    if regex.is_match(text) {
        Ok(())
    } else {
        Err(TranslateError::MissingFrontMatter)
    }
}

/// Translate one document into one locale, returning validated text.
pub async fn translate_text_document<M: ChatModel>(
    model: &M,
    settings: &TranslatorSettings,
    request: &TextRequest<'_>,
) -> Result<String> {
    let (system_prompt, user_prompt) = match request.existing {
        Some(existing) => {
            info!("Existing translation found, updating incrementally");
            (
                incremental_system_prompt(request.source_name, request.target_name),
                settings.user_prompt(incremental_user_prompt(request, existing)),
            )
        }
        None => (
            full_system_prompt(request.source_name, request.target_name),
            settings.user_prompt(request.source.to_string()),
        ),
    };

    let reply = model.complete(&system_prompt, &user_prompt).await?;
    let text = post_process(&reply, request.source_locale, request.target_locale);
    validate_front_matter(&text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::testing::ScriptedModel;

    const DOC: &str = "---\ntitle: Getting started\n---\n\nSee [setup](/en/docs/setup).\n";

    fn request<'a>(existing: Option<&'a str>, diff: Option<&'a str>) -> TextRequest<'a> {
        TextRequest {
            source: DOC,
            source_locale: "en",
            source_name: "English",
            target_locale: "zh",
            target_name: "简体中文",
            existing,
            diff,
        }
    }

    // ==================== Post-processing ====================

    #[test]
    fn test_post_process_rewrites_locale_segments() {
        let text = post_process("[a](/en/docs) and [b](/en/blog/)", "en", "zh");
        assert_eq!(text, "[a](/zh/docs) and [b](/zh/blog/)");
    }

    #[test]
    fn test_post_process_leaves_partial_matches() {
        let text = post_process("https://example.com/english/ and /en", "en", "zh");
        assert_eq!(text, "https://example.com/english/ and /en");
    }

    #[test]
    fn test_post_process_terminates_trailing_delimiter() {
        assert_eq!(post_process("---\ntitle: x\n---", "en", "zh"), "---\ntitle: x\n---\n");
    }

    // ==================== Validation ====================

    #[test]
    fn test_front_matter_with_title_is_valid() {
        assert!(validate_front_matter(DOC).is_ok());
    }

    #[test]
    fn test_front_matter_title_after_other_fields() {
        let doc = "---\ndescription: d\ntitle: T\nicon: x\n---\nbody";
        assert!(validate_front_matter(doc).is_ok());
    }

    #[test]
    fn test_missing_front_matter_is_rejected() {
        let reply = "Here is the translation you asked for:\n\n# 入门\n";
        assert!(matches!(
            validate_front_matter(reply),
            Err(TranslateError::MissingFrontMatter)
        ));
    }

    #[test]
    fn test_front_matter_must_lead() {
        let reply = "Sure!\n---\ntitle: T\n---\n";
        assert!(validate_front_matter(reply).is_err());
    }

    #[test]
    fn test_front_matter_without_title_is_rejected() {
        assert!(validate_front_matter("---\ndescription: d\n---\nbody").is_err());
    }

    // ==================== Translation ====================

    #[tokio::test]
    async fn test_full_translation_post_processes_reply() {
        let model =
            ScriptedModel::new(["---\ntitle: 入门\n---\n\n参见 [安装](/en/docs/setup)。\n"]);
        let settings = TranslatorSettings::immediate();

        let text = translate_text_document(&model, &settings, &request(None, None))
            .await
            .unwrap();

        assert_eq!(text, "---\ntitle: 入门\n---\n\n参见 [安装](/zh/docs/setup)。\n");
        assert!(model.system_prompts()[0].contains("from English to 简体中文"));
        assert!(model.prompts()[0].starts_with(DOC));
    }

    #[tokio::test]
    async fn test_incremental_prompt_includes_old_translation_and_diff() {
        let model = ScriptedModel::new(["---\ntitle: 入门\n---\n"]);
        let settings = TranslatorSettings::immediate();
        let old = "---\ntitle: 旧\n---\n";

        translate_text_document(&model, &settings, &request(Some(old), Some("-a\n+b\n")))
            .await
            .unwrap();

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("[START OF NEW SOURCE]"));
        assert!(prompt.contains("title: 旧"));
        assert!(prompt.contains("-a\n+b"));
        assert!(model.system_prompts()[0].contains("as little as possible"));
    }

    #[tokio::test]
    async fn test_invalid_reply_is_an_error() {
        let model = ScriptedModel::new(["I cannot translate this document."]);
        let settings = TranslatorSettings::immediate();

        let err = translate_text_document(&model, &settings, &request(None, None))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TranslateError>(),
            Some(TranslateError::MissingFrontMatter)
        ));
    }

    #[tokio::test]
    async fn test_thinking_suppression_suffix() {
        let model = ScriptedModel::new(["---\ntitle: T\n---\n"]);
        let settings = TranslatorSettings {
            disable_thinking: true,
            ..TranslatorSettings::immediate()
        };

        translate_text_document(&model, &settings, &request(None, None))
            .await
            .unwrap();

        assert!(model.prompts()[0].ends_with(" /no_think"));
    }
}
