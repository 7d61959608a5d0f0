// SPDX-License-Identifier: GPL-3.0-only

//! User and group name validation, plus the username guesser.

/// Names that never become regular accounts, beyond whatever exists in the
/// root directory of the target.
const RESERVED_NAMES: &[&str] = &[
    "root", "bin", "daemon", "adm", "lp", "sync", "shutdown", "halt", "mail", "operator",
    "games", "ftp", "nobody", "home", "system",
];

const MAX_NAME_LENGTH: usize = 32;

/// Strict POSIX-portable name validity, shared by users and groups.
pub fn is_name_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    if name.starts_with('-') || name == "." || name == ".." {
        return false;
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if name == "$" {
        return false;
    }
    // A trailing $ is tolerated for machine accounts and stripped before
    // the character check.
    let body = name.strip_suffix('$').unwrap_or(name);
    body.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Whether a username is acceptable for a new account: not reserved, not
/// colliding with a top-level directory, and within the length limit.
pub fn check_username(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    if RESERVED_NAMES.contains(&name) {
        return false;
    }
    // Top-level directories of the target make confusing home directories.
    if let Ok(entries) = std::fs::read_dir("/") {
        for entry in entries.filter_map(|entry| entry.ok()) {
            if entry.file_name().to_string_lossy() == name {
                return false;
            }
        }
    }
    true
}

/// Validate a comma-separated group list; whitespace around names is
/// tolerated and an empty list is fine.
pub fn check_grouplist(list: &str) -> bool {
    if list.trim().is_empty() {
        return true;
    }
    list.split(',')
        .map(str::trim)
        .all(|name| !name.is_empty() && is_name_valid(name))
}

/// Fold accented Latin characters to their ASCII base.
fn strip_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
            'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
            'ç' | 'ć' | 'č' => 'c',
            'Ç' | 'Ć' | 'Č' => 'C',
            'ď' | 'đ' => 'd',
            'Ď' | 'Đ' => 'D',
            'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
            'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Į' => 'I',
            'ł' => 'l',
            'Ł' => 'L',
            'ñ' | 'ń' | 'ň' => 'n',
            'Ñ' | 'Ń' | 'Ň' => 'N',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ő' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ő' => 'O',
            'ř' => 'r',
            'Ř' => 'R',
            'š' | 'ś' => 's',
            'Š' | 'Ś' => 'S',
            'ť' => 't',
            'Ť' => 'T',
            'ú' | 'ù' | 'û' | 'ü' | 'ů' | 'ű' | 'ū' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ů' | 'Ű' | 'Ū' => 'U',
            'ý' | 'ÿ' => 'y',
            'Ý' => 'Y',
            'ž' | 'ź' | 'ż' => 'z',
            'Ž' | 'Ź' | 'Ż' => 'Z',
            'ß' => 's',
            other => other,
        })
        .collect()
}

/// Guess a username from a full name: the lowercased last token, prefixed
/// with the first letter of the first token when there is more than one.
/// An invalid candidate yields nothing.
pub fn guess_username(full_name: &str) -> String {
    let folded = strip_accents(full_name);
    let tokens: Vec<&str> = folded.split_whitespace().collect();

    let candidate = match tokens.as_slice() {
        [] => return String::new(),
        [only] => only.to_lowercase(),
        [first, .., last] => {
            let initial = first.chars().next().map(|c| c.to_ascii_lowercase());
            match initial {
                Some(initial) => format!("{initial}{}", last.to_lowercase()),
                None => last.to_lowercase(),
            }
        }
    };

    if is_name_valid(&candidate) {
        candidate
    } else {
        String::new()
    }
}
