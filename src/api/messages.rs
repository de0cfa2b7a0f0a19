//! Closed set of user-facing response messages.
//!
//! Handlers only ever reply with strings from this catalog so clients can
//! match on them.

pub const BAD_LOGIN_REQUEST: &str = "Incorrect username or password";
pub const WRONG_CREDS: &str = "Wrong Credentials Provided";
pub const INVALID_CREDS: &str = "Could not validate credentials";

pub const USER_ALREADY_EXISTS: &str = "User already exists";
pub const USER_NOT_FOUND: &str = "User not found";
pub const USER_DOES_NOT_EXIST: &str = "User does not exist.";

pub const EMAIL_NOT_VERIFIED: &str = "Email not verified.";
pub const EMAIL_ALREADY_VERIFIED: &str = "Email already verified";
pub const EMAIL_VERIFICATION_PURPOSE_MISMATCH: &str = "Email not verified. Change the purpose.";

pub const PASSWORD_UPDATED: &str = "Password updated successfully";
pub const PASSWORD_RESET_SUCCESS: &str = "Password reset successful.";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Given password does not match.";

pub const OTP_REQUIRED: &str = "OTP verification required before resetting password.";
pub const OTP_WINDOW_EXPIRED: &str = "Password reset window expired. Please request OTP again.";
pub const OTP_ALREADY_SENT: &str = "OTP already sent. Please wait before requesting a new one.";
pub const OTP_SENT: &str = "OTP sent successfully";
pub const OTP_NOT_FOUND: &str = "OTP not found for this email";
pub const OTP_INVALID: &str = "Invalid OTP";
pub const OTP_EXPIRED: &str = "OTP expired";
pub const OTP_VERIFIED: &str = "OTP verified successfully";

pub const INVALID_OTP_PURPOSE: &str = "Invalid OTP purpose.";

pub const DETAILS_UPDATED: &str = "Updated Details Successfully";

pub const INVALID_EMAIL: &str = "Invalid email address.";
pub const MISSING_PAYLOAD: &str = "Missing payload";
pub const TOO_MANY_REQUESTS: &str = "Too many requests";
