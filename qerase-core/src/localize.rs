use fluent_bundle::{FluentArgs, FluentBundle, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

/// Fluent-based localizer with built-in resources.
///
/// Not `Send`: build it on the thread that formats messages.
pub struct FluentLoc {
    bundle: FluentBundle<FluentResource>,
}

impl FluentLoc {
    /// Create a localizer from the built-in `.ftl` strings (see ../i18n).
    /// Unknown languages get en-GB.
    pub fn builtin(lang: &str) -> Self {
        let (tag, ftl_src) = match lang {
            "zh-CN" | "zh" => ("zh-CN", include_str!("../i18n/zh-CN.ftl")),
            _ => ("en-GB", include_str!("../i18n/en-GB.ftl")),
        };
        let langid: LanguageIdentifier = tag.parse().unwrap_or_default();

        let res = FluentResource::try_new(ftl_src.to_owned())
            .unwrap_or_else(|(res, _errs)| res);

        let mut bundle = FluentBundle::new(vec![langid]);
        // Paths must come out byte-for-byte, without bidi isolation marks.
        bundle.set_use_isolating(false);
        if let Err(errs) = bundle.add_resource(res) {
            tracing::warn!(?errs, lang = tag, "overlapping messages in built-in resource");
        }
        Self { bundle }
    }

    /// Format a message by code with named args (("name","value"), ...).
    /// Returns the code itself if not found.
    pub fn msg(&self, code: &str, args: &[(&str, &str)]) -> String {
        let Some(msg) = self.bundle.get_message(code) else {
            return code.to_string();
        };
        let Some(pattern) = msg.value() else {
            return code.to_string();
        };

        let mut fa = FluentArgs::new();
        for (k, v) in args {
            fa.set(*k, FluentValue::from(*v));
        }

        let mut errs = vec![];
        let s = self.bundle.format_pattern(pattern, Some(&fa), &mut errs).to_string();

        if errs.is_empty() {
            s
        } else {
            code.to_string()
        }
    }
}
