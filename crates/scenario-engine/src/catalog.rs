//! 只读数据池
//!
//! User-Agent、承运商、支付方式、商品名称片段等常量，构造后从不修改，可在任意线程共享。

/// 常见浏览器 User-Agent
pub const BROWSER_USER_AGENTS: [&str; 10] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.5615.137 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; rv:112.0) Gecko/20100101 Firefox/112.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_4_1 like Mac OS X) AppleWebKit/604.5.6 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.5481.153 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:100.0) Gecko/20100101 Firefox/100.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_3_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:55.0) Gecko/20100101 Firefox/55.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.102 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15",
];

/// 已知爬虫 User-Agent
pub const BOT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (compatible; Facebookbot/1.0; +http://www.facebook.com/externalhit_uatext.php)",
    "Mozilla/5.0 (compatible; YandexBot/3.0; +http://yandex.com/bots)",
];

pub const OPERATING_SYSTEMS: [&str; 5] = ["Windows 10", "macOS", "iOS", "Android", "Linux"];

pub const SHIPPING_PROVIDERS: [&str; 6] = [
    "UPS",
    "FedEx",
    "DHL",
    "USPS",
    "Royal Mail",
    "Amazon Logistics",
];

pub const PAYMENT_METHODS: [&str; 5] = [
    "Credit Card",
    "PayPal",
    "Apple Pay",
    "Google Pay",
    "Bank Transfer",
];

/// 支付失败时附带的固定错误原因
pub const PAYMENT_GATEWAY_ERROR: &str = "Payment gateway error (simulated).";

pub const PRODUCT_ADJECTIVES: [&str; 16] = [
    "Small",
    "Ergonomic",
    "Rustic",
    "Intelligent",
    "Gorgeous",
    "Incredible",
    "Fantastic",
    "Practical",
    "Sleek",
    "Awesome",
    "Generic",
    "Handcrafted",
    "Handmade",
    "Licensed",
    "Refined",
    "Unbranded",
];

pub const PRODUCT_MATERIALS: [&str; 11] = [
    "Steel", "Wooden", "Concrete", "Plastic", "Cotton", "Granite", "Rubber", "Metal", "Soft",
    "Fresh", "Frozen",
];

pub const PRODUCT_NOUNS: [&str; 20] = [
    "Chair", "Car", "Computer", "Keyboard", "Mouse", "Bike", "Ball", "Gloves", "Pants", "Shirt",
    "Table", "Shoes", "Hat", "Towels", "Soap", "Tuna", "Chicken", "Cheese", "Pizza", "Salad",
];

pub const DEPARTMENTS: [&str; 16] = [
    "Books",
    "Movies",
    "Music",
    "Games",
    "Electronics",
    "Computers",
    "Home",
    "Garden",
    "Tools",
    "Grocery",
    "Health",
    "Beauty",
    "Toys",
    "Clothing",
    "Sports",
    "Automotive",
];

/// 各事件对应的模拟 API 路径
pub mod paths {
    pub const LOGIN: &str = "/api/login";
    pub const BROWSE: &str = "/api/products";
    pub const ADD_TO_CART: &str = "/api/cart/add";
    pub const CHECKOUT: &str = "/api/checkout";
    pub const PAYMENT: &str = "/api/payment";
    pub const SHIPPING: &str = "/api/shipping";
}
