//! File name classification for display.
//!
//! A name is mapped to a category through two lookup tables (exact file
//! name, then extension), and the category to an icon and color token. The
//! tables are built once at startup and only read afterwards.

use std::collections::HashMap;
use std::path::Path;

/// Category reported when nothing matches.
pub const DEFAULT_CATEGORY: &str = "default";

/// Icon for categories with no style entry.
pub const DEFAULT_ICON: &str = "ti ti-file";

/// Color for categories with no style entry.
pub const DEFAULT_COLOR: &str = "#212529";

/// Category assigned to directories.
pub const FOLDER_CATEGORY: &str = "folder";

/// Icon for directories.
pub const FOLDER_ICON: &str = "ti ti-folder-filled";

/// Color for directories.
pub const FOLDER_COLOR: &str = "#5988da";

/// Category of the synthetic `..` entry.
pub const PARENT_CATEGORY: &str = "parent";

/// Icon for the synthetic `..` entry.
pub const PARENT_ICON: &str = "ti ti-corner-up-left-double";

/// Color for the synthetic `..` entry.
pub const PARENT_COLOR: &str = "#0d6efd";

/// Whole file names (lowercase) that carry no useful extension.
const NAME_CATEGORIES: &[(&str, &str)] = &[
    ("dockerfile", "docker"),
    (".dockerignore", "docker"),
    (".gitignore", "git"),
    (".git", "git"),
    ("id_rsa", "private"),
    ("id_rsa.pub", "key"),
    ("id_ed25519", "private"),
    ("id_ed25519.pub", "key"),
];

/// Extensions (lowercase, without the dot).
const EXTENSION_CATEGORIES: &[(&str, &str)] = &[
    ("yml", "config"),
    ("yaml", "config"),
    ("toml", "config"),
    ("conf", "config"),
    ("ini", "config"),
    ("cfg", "config"),
    ("properties", "config"),
    ("env", "config"),
    ("json", "json"),
    ("jsonl", "json"),
    ("csv", "csv"),
    ("py", "python"),
    ("txt", "text"),
    ("md", "markdown"),
    ("html", "html"),
    ("css", "css"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("asm", "assembly"),
    ("s", "assembly"),
    ("c", "c_cpp"),
    ("cpp", "c_cpp"),
    ("h", "c_cpp"),
    ("hpp", "c_cpp"),
    ("cs", "csharp"),
    ("java", "java"),
    ("jar", "java"),
    ("war", "java"),
    ("class", "java"),
    ("php", "php"),
    ("go", "go"),
    ("rs", "rust"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("r", "r"),
    ("rb", "code"),
    ("dart", "code"),
    ("pl", "code"),
    ("asp", "code"),
    ("aspx", "code"),
    ("vb", "code"),
    ("vbs", "code"),
    ("erl", "code"),
    ("ex", "code"),
    ("exs", "code"),
    ("clj", "code"),
    ("cljs", "code"),
    ("cljc", "code"),
    ("edn", "code"),
    ("scala", "code"),
    ("sc", "code"),
    ("groovy", "code"),
    ("gradle", "code"),
    ("lua", "code"),
    ("nim", "code"),
    ("nimble", "code"),
    ("cr", "code"),
    ("v", "code"),
    ("vsh", "code"),
    ("zig", "code"),
    ("zigmod", "code"),
    ("wasm", "code"),
    ("sh", "shell"),
    ("bat", "shell"),
    ("ps1", "powershell"),
    ("dll", "library"),
    ("cab", "library"),
    ("exe", "windows"),
    ("msi", "windows"),
    ("deb", "deb"),
    ("rpm", "redhat"),
    ("iso", "disk"),
    ("img", "disk"),
    ("so", "binary"),
    ("dylib", "binary"),
    ("o", "binary"),
    ("pyc", "binary"),
    ("lib", "binary"),
    ("bin", "binary"),
    ("apk", "android"),
    ("aab", "android"),
    ("ipa", "apple"),
    ("dmg", "apple"),
    ("pkg", "apple"),
    ("app", "application"),
    ("pcap", "network"),
    ("pcapng", "network"),
    ("db", "database"),
    ("sqlite", "database"),
    ("sqlite3", "database"),
    ("sql", "sql"),
    ("log", "log"),
    ("pdf", "pdf"),
    ("jpg", "image"),
    ("jpeg", "image"),
    ("png", "image"),
    ("gif", "image"),
    ("svg", "image"),
    ("bmp", "image"),
    ("ico", "image"),
    ("zip", "archive"),
    ("tar", "archive"),
    ("gz", "archive"),
    ("7z", "archive"),
    ("rar", "archive"),
    ("bz2", "archive"),
    ("xz", "archive"),
    ("zst", "archive"),
    ("tgz", "archive"),
    ("xml", "xml"),
    ("tex", "latex"),
    ("ltx", "latex"),
    ("sty", "latex"),
    ("cls", "latex"),
    ("bib", "latex"),
    ("mp3", "music"),
    ("wav", "music"),
    ("flac", "music"),
    ("aac", "music"),
    ("ogg", "music"),
    ("wma", "music"),
    ("m4a", "music"),
    ("mp4", "video"),
    ("mkv", "video"),
    ("avi", "video"),
    ("mov", "video"),
    ("wmv", "video"),
    ("flv", "video"),
    ("webm", "video"),
    ("crt", "certificate"),
    ("pem", "certificate"),
    ("cer", "certificate"),
    ("pfx", "certificate"),
    ("p12", "certificate"),
    ("der", "certificate"),
    ("csr", "certificate"),
    ("key", "key"),
    ("gpg", "key"),
    ("ttf", "font"),
    ("otf", "font"),
    ("woff", "font"),
    ("woff2", "font"),
    ("eot", "font"),
    ("rst", "restructuredtext"),
    ("ipynb", "jupyter"),
    ("jinja", "template"),
    ("j2", "template"),
];

/// Category → (icon, color).
const CATEGORY_STYLES: &[(&str, &str, &str)] = &[
    ("docker", "ti ti-brand-docker", "#0db7ed"),
    ("git", "ti ti-brand-git", "#f34f29"),
    ("config", "ti ti-file-settings", "#ff6600"),
    ("json", "ti ti-json", "#f27e55"),
    ("csv", "ti ti-file-type-csv", "#46b058"),
    ("python", "ti ti-brand-python", "#0d6efd"),
    ("text", "ti ti-file-type-txt", "#6c757d"),
    ("markdown", "ti ti-markdown", "#212529"),
    ("html", "ti ti-brand-html5", "#FFA500"),
    ("css", "ti ti-brand-css3", "#264de4"),
    ("javascript", "ti ti-brand-javascript", "#ffc107"),
    ("typescript", "ti ti-brand-typescript", "#3178C6"),
    ("assembly", "ti ti-letter-s", "#00599C"),
    ("code", "ti ti-code", "#00599C"),
    ("c", "ti ti-letter-c", "#00599C"),
    ("c_cpp", "ti ti-brand-cpp", "#00599C"),
    ("csharp", "ti ti-brand-c-sharp", "#5731d4"),
    ("java", "ti ti-coffee", "#ED8B00"),
    ("php", "ti ti-brand-php", "#4F5D95"),
    ("go", "ti ti-brand-golang", "#00ADD8"),
    ("rust", "ti ti-brand-rust", "#DEA584"),
    ("swift", "ti ti-brand-swift", "#FA7343"),
    ("kotlin", "ti ti-brand-kotlin", "#0095D5"),
    ("r", "ti ti-letter-r", "#276DC3"),
    ("shell", "ti ti-terminal-2", "#00976e"),
    ("powershell", "ti ti-brand-powershell", "#357EC7"),
    ("windows", "ti ti-brand-windows-filled", "#357EC7"),
    ("library", "ti ti-book-2", "#357EC7"),
    ("deb", "ti ti-brand-debian", "#d63384"),
    ("redhat", "ti ti-brand-redhat", "#d63384"),
    ("disk", "ti ti-disc-filled", "#71c285"),
    ("binary", "ti ti-binary", "#6c757d"),
    ("android", "ti ti-brand-android", "#3ddc84"),
    ("apple", "ti ti-brand-apple-filled", "#A2AAAD"),
    ("application", "ti ti-apps-filled", "#6c757d"),
    ("network", "ti ti-triangle-filled", "#0052ff"),
    ("database", "ti ti-database", "#6f42c1"),
    ("sql", "ti ti-file-type-sql", "#2278bf"),
    ("log", "ti ti-file-text", "#6c757d"),
    ("pdf", "ti ti-file-type-pdf", "#dc3545"),
    ("image", "ti ti-photo-filled", "#0dcaf0"),
    ("archive", "ti ti-file-zip", "#6c757d"),
    ("xml", "ti ti-file-type-xml", "#ff6600"),
    ("latex", "ti ti-tex", "#3D6117"),
    ("music", "ti ti-file-music", "#ff5733"),
    ("video", "ti ti-movie", "#33c1ff"),
    ("certificate", "ti ti-certificate", "#ffcc00"),
    ("key", "ti ti-key", "#ffcc00"),
    ("private", "ti ti-lock-filled", "#ffcc00"),
    ("font", "ti ti-letter-case", "#6c757d"),
    ("restructuredtext", "ti ti-file-text", "#6c757d"),
    ("jupyter", "ti ti-notebook", "#f37626"),
    ("template", "ti ti-template", "#b01a19"),
];

/// Result of classifying one file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    /// Display category.
    pub category: &'a str,
    /// Icon token.
    pub icon: &'a str,
    /// Color token.
    pub color: &'a str,
}

/// Read-only lookup tables for [`CategoryTable::classify`].
#[derive(Debug, Clone)]
pub struct CategoryTable {
    names: HashMap<String, String>,
    extensions: HashMap<String, String>,
    styles: HashMap<String, (String, String)>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryTable {
    /// The built-in tables.
    pub fn builtin() -> Self {
        let names = NAME_CATEGORIES
            .iter()
            .map(|(name, category)| (name.to_string(), category.to_string()))
            .collect();
        let extensions = EXTENSION_CATEGORIES
            .iter()
            .map(|(ext, category)| (ext.to_string(), category.to_string()))
            .collect();
        let styles = CATEGORY_STYLES
            .iter()
            .map(|(category, icon, color)| {
                (category.to_string(), (icon.to_string(), color.to_string()))
            })
            .collect();

        Self {
            names,
            extensions,
            styles,
        }
    }

    /// Merge extra name and extension mappings over the built-in ones.
    ///
    /// Keys are lowercased; extension keys may be given with or without a
    /// leading dot.
    pub fn with_overrides<'a, N, E>(mut self, names: N, extensions: E) -> Self
    where
        N: IntoIterator<Item = (&'a String, &'a String)>,
        E: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, category) in names {
            self.names.insert(name.to_lowercase(), category.clone());
        }
        for (ext, category) in extensions {
            let ext = ext.trim_start_matches('.').to_lowercase();
            self.extensions.insert(ext, category.clone());
        }
        self
    }

    /// Classify a file name.
    ///
    /// Lookup order: the whole lowercased name, then its lowercased final
    /// extension, then [`DEFAULT_CATEGORY`].
    pub fn classify(&self, file_name: &str) -> Classification<'_> {
        let category = self.category_of(file_name);
        let (icon, color) = self
            .styles
            .get(category)
            .map(|(icon, color)| (icon.as_str(), color.as_str()))
            .unwrap_or((DEFAULT_ICON, DEFAULT_COLOR));

        Classification {
            category,
            icon,
            color,
        }
    }

    fn category_of(&self, file_name: &str) -> &str {
        let lower = file_name.to_lowercase();

        if let Some(category) = self.names.get(&lower) {
            return category;
        }

        // Dotfiles named exactly like an extension, e.g. `.env`.
        if let Some(category) = lower
            .strip_prefix('.')
            .and_then(|bare| self.extensions.get(bare))
        {
            return category;
        }

        Path::new(&lower)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.extensions.get(ext))
            .map(String::as_str)
            .unwrap_or(DEFAULT_CATEGORY)
    }
}
