pub mod evidence;
pub mod validate;
