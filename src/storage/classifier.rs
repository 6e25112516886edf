use std::fmt;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Image,
    Video,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Other => "other",
        };
        f.write_str(label)
    }
}

// Every `image/*` entry must be decodable, or saves with previews enabled fail.
pub fn mime_type_of(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "wmv" => "video/x-ms-wmv",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "mid" | "midi" => "audio/midi",
        "weba" => "audio/webm",
        "txt" | "log" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "ics" => "text/calendar",
        "vcf" => "text/vcard",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "text/xml",
        "yaml" | "yml" => "application/yaml",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/x-gzip",
        "tar" => "application/x-tar",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        _ => return None,
    };
    Some(mime)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    mime_type_of(super::naming::extension_of(file_name)).unwrap_or(DEFAULT_MIME_TYPE)
}

pub fn classify(extension: &str) -> Category {
    match mime_type_of(extension) {
        Some(mime) if mime.starts_with("image/") => Category::Image,
        Some(mime) if mime.starts_with("video/") => Category::Video,
        _ => Category::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_mime_prefix() {
        assert_eq!(classify(".jpg"), Category::Image);
        assert_eq!(classify("PNG"), Category::Image);
        assert_eq!(classify(".mp4"), Category::Video);
        assert_eq!(classify(".MOV"), Category::Video);
        assert_eq!(classify(".txt"), Category::Other);
        assert_eq!(classify(".mp3"), Category::Other);
    }

    #[test]
    fn unknown_and_empty_extensions_are_other() {
        assert_eq!(classify(".unknownext"), Category::Other);
        assert_eq!(classify(""), Category::Other);
    }

    #[test]
    fn archives_audio_and_documents_have_types() {
        assert_eq!(content_type_for("backup.tar"), "application/x-tar");
        assert_eq!(content_type_for("backup.7z"), "application/x-7z-compressed");
        assert_eq!(content_type_for("song.FLAC"), "audio/flac");
        assert_eq!(content_type_for("letter.rtf"), "application/rtf");
        assert_eq!(content_type_for("README.md"), "text/markdown");
        assert_eq!(classify(".flac"), Category::Other);
        assert_eq!(classify(".7z"), Category::Other);
    }

    #[test]
    fn content_type_falls_back_to_octet_stream() {
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("blob.xyz"), DEFAULT_MIME_TYPE);
        assert_eq!(content_type_for("no-extension"), DEFAULT_MIME_TYPE);
    }
}
