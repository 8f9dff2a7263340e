//! HTML email templates.

use chrono::{Datelike, Utc};

use super::Email;
use crate::database::models::user::CODE_TTL_MINUTES;

const BRAND_GREEN: &str = "#16a34a";
const BRAND_RED: &str = "#dc2626";

/// Escape text for interpolation into HTML.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(accent: &str, heading: &str, body: &str) -> String {
    format!(
        r#"<div style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #f4f6f8; padding: 40px;">
  <div style="max-width: 500px; margin: 0 auto; background: #ffffff; border-radius: 10px; overflow: hidden;">
    <div style="background-color: {accent}; padding: 20px; text-align: center;">
      <h1 style="color: #ffffff; margin: 0; font-size: 24px;">Nandha Notes</h1>
    </div>
    <div style="padding: 30px; text-align: center;">
      <h2 style="color: #333333; font-size: 20px; margin-bottom: 15px;">{heading}</h2>
      {body}
    </div>
    <div style="background-color: #f1f5f9; padding: 15px; text-align: center; font-size: 13px; color: #888888;">
      <p style="margin: 0;">&copy; {year} Nandha Notes. All rights reserved.</p>
    </div>
  </div>
</div>"#,
        year = Utc::now().year(),
    )
}

fn code_block(accent: &str, code: &str) -> String {
    format!(
        r#"<div style="display: inline-block; padding: 15px 30px; background-color: {accent}; color: #ffffff; font-size: 28px; font-weight: bold; letter-spacing: 3px; border-radius: 8px;">{code}</div>"#,
        code = html_escape(code),
    )
}

pub fn verification(to: &str, username: &str, code: &str) -> Email {
    let body = format!(
        r#"<p style="color: #555555; font-size: 16px;">Hello {name}, thank you for signing up for <strong>Nandha Notes</strong>.<br>Use the verification code below to complete your registration:</p>
      {code}
      <p style="color: #777777; font-size: 14px;">This code will expire in {CODE_TTL_MINUTES} minutes. Please do not share it with anyone.</p>"#,
        name = html_escape(username),
        code = code_block(BRAND_GREEN, code),
    );

    Email {
        to: to.to_string(),
        subject: "Verify your Nandha Notes Account".to_string(),
        html: layout(BRAND_GREEN, "Verify Your Email Address", &body),
    }
}

pub fn password_reset(to: &str, code: &str) -> Email {
    let body = format!(
        r#"<p style="color: #555555; font-size: 16px;">We received a request to reset the password for your <strong>Nandha Notes</strong> account. Use the code below to reset it:</p>
      {code}
      <p style="color: #777777; font-size: 14px;">This code will expire in {CODE_TTL_MINUTES} minutes.<br>If you didn't request this, you can safely ignore this email.</p>"#,
        code = code_block(BRAND_RED, code),
    );

    Email {
        to: to.to_string(),
        subject: "Password Reset Code - Nandha Notes".to_string(),
        html: layout(BRAND_RED, "Password Reset Request", &body),
    }
}

/// Notice to a channel member that a new note was shared.
pub fn channel_upload(to: &str, channel_name: &str, uploader: &str, title: &str, file_url: &str) -> Email {
    let body = format!(
        r#"<p style="color: #555555; font-size: 16px;"><strong>{uploader}</strong> uploaded <strong>{title}</strong> to <strong>{channel}</strong>.</p>
      <p><a href="{url}" style="color: {BRAND_GREEN}; font-weight: bold;">Open the note</a></p>
      <p style="color: #777777; font-size: 13px;">You can turn these emails off in your settings.</p>"#,
        uploader = html_escape(uploader),
        title = html_escape(title),
        channel = html_escape(channel_name),
        url = html_escape(file_url),
    );

    Email {
        to: to.to_string(),
        subject: format!("New note in {channel_name} - Nandha Notes"),
        html: layout(BRAND_GREEN, "New Study Material", &body),
    }
}

pub fn connectivity_test(to: &str) -> Email {
    let body = format!(
        r#"<p style="color: #555555; font-size: 16px;">Your Nandha Notes email system is working.</p>
      <p style="color: #777777; font-size: 14px;">Time: {}</p>"#,
        Utc::now().to_rfc2822(),
    );

    Email {
        to: to.to_string(),
        subject: "Email Test - Nandha Notes".to_string(),
        html: layout(BRAND_GREEN, "Email Test Successful", &body),
    }
}
