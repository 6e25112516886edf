use uuid::Uuid;

pub fn extension_of(file_name: &str) -> &str {
    // Clients may send either separator.
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match base.rfind('.') {
        None => "",
        Some(index) if index == base.len() - 1 => "",
        Some(index) => &base[index..],
    }
}

pub fn new_name(original_file_name: &str) -> String {
    name_with_extension(extension_of(original_file_name))
}

pub fn name_with_extension(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}
