//! 验证码口令：生成、拼接图片地址、校验用户回答。
//!
//! 不负责口令存储；调用方（如群组 bot 后端）自行保存下发的口令并在收到回答时校验。

use rand::Rng;
use rand::seq::SliceRandom;

/// 默认口令长度
pub const DEFAULT_CIPHER_LEN: usize = 4;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 生成 `len` 个互不重复的大写字母（最多 26 个）
pub fn generate_cipher(len: usize) -> String {
    generate_cipher_with(&mut rand::thread_rng(), len)
}

/// 使用指定随机源生成口令
pub fn generate_cipher_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let mut letters = *ALPHABET;
    letters.shuffle(rng);
    letters
        .iter()
        .take(len.min(ALPHABET.len()))
        .map(|&b| char::from(b))
        .collect()
}

/// 拼接渲染口令的图片地址：`endpoint?text=<cipher>`
pub fn captcha_url(endpoint: &str, cipher: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("text", cipher)
        .finish();
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{sep}{query}")
}

/// 校验回答：去掉所有空白并转大写后与口令比较
pub fn verify_answer(cipher: &str, answer: &str) -> bool {
    let normalized: String = answer
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    constant_time_eq(Some(cipher), Some(&normalized))
}

/// 比较两个字符串，长度相同时不因首个差异字节提前返回；任一侧缺失或为空均视为不相等
pub fn constant_time_eq(left: Option<&str>, right: Option<&str>) -> bool {
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    if left.is_empty() || right.is_empty() || left.len() != right.len() {
        return false;
    }
    left.bytes()
        .zip(right.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
