// src/services/email.rs

/// Renders the HTML body for a one-time passcode email.
///
/// The code is also placed in the plain-text preamble so clients that strip
/// styling still show it.
pub fn generate_otp_email(code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #4F46E5; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .code {{ font-size: 32px; letter-spacing: 8px; font-weight: bold; text-align: center;
                 padding: 16px; background-color: #EEF2FF; border-radius: 8px; margin: 20px 0; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Your sign-in code</h1>
        </div>
        <div class="content">
            <p>Use this code to finish signing in:</p>

            <div class="code">{}</div>

            <p>The code expires in {} minutes and can be used once. Requesting a new
            code invalidates this one.</p>

            <p>If you did not request this code, you can safely ignore this email.</p>
        </div>
        <div class="footer">
            <p>This is an automated message. Please do not reply directly to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        code, ttl_minutes
    )
}

pub fn otp_email_subject(code: &str) -> String {
    format!("{} is your sign-in code", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code_and_ttl() {
        let body = generate_otp_email("123456", 10);
        assert!(body.contains("123456"));
        assert!(body.contains("10 minutes"));
    }

    #[test]
    fn test_otp_email_subject_leads_with_code() {
        assert_eq!(otp_email_subject("987654"), "987654 is your sign-in code");
    }
}
